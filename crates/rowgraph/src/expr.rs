//! Predicate expression AST.
//!
//! Pure, schema-agnostic representation of filter predicates. No rendering or
//! validation happens here; the SQL compiler resolves field references against
//! the registry and turns literals into bound parameters.

use crate::value::Value;
use std::fmt::{self, Display};

///
/// FieldRef
/// A column reference, qualified by schema name.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FieldRef {
    pub schema: String,
    pub field: String,
}

impl FieldRef {
    #[must_use]
    pub fn new(schema: &str, field: &str) -> Self {
        Self {
            schema: schema.to_string(),
            field: field.to_string(),
        }
    }
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Ne,
    In,
    NotIn,
    Is,
    IsNot,
    Like,
    Ilike,
    Between,
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Ne => "!=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::Like => "LIKE",
            Self::Ilike => "ILIKE",
            Self::Between => "BETWEEN",
        };
        write!(f, "{sql}")
    }
}

///
/// BoolOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoolOp {
    And,
    Or,
}

impl Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = match self {
            Self::And => "AND",
            Self::Or => "OR",
        };
        write!(f, "{sql}")
    }
}

///
/// Rhs
/// Right-hand operand of a comparison.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rhs {
    Value(Value),
    List(Vec<Value>),
    /// Bounds of a BETWEEN comparison.
    Pair(Value, Value),
}

///
/// Expr
///
/// Immutable binary expression tree. `Comparison` against `Value::Null` with
/// `Eq`/`Ne` compiles to `IS NULL`/`IS NOT NULL` rather than `= NULL`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    Comparison {
        field: FieldRef,
        op: CompareOp,
        rhs: Rhs,
    },
    Composite {
        left: Box<Expr>,
        op: BoolOp,
        right: Box<Expr>,
    },
}

impl Expr {
    fn compare(field: FieldRef, op: CompareOp, rhs: Rhs) -> Self {
        Self::Comparison { field, op, rhs }
    }
}

#[must_use]
pub fn eq(field: FieldRef, value: impl Into<Value>) -> Expr {
    Expr::compare(field, CompareOp::Eq, Rhs::Value(value.into()))
}

#[must_use]
pub fn ne(field: FieldRef, value: impl Into<Value>) -> Expr {
    Expr::compare(field, CompareOp::Ne, Rhs::Value(value.into()))
}

#[must_use]
pub fn lt(field: FieldRef, value: impl Into<Value>) -> Expr {
    Expr::compare(field, CompareOp::Lt, Rhs::Value(value.into()))
}

#[must_use]
pub fn lte(field: FieldRef, value: impl Into<Value>) -> Expr {
    Expr::compare(field, CompareOp::Lte, Rhs::Value(value.into()))
}

#[must_use]
pub fn gt(field: FieldRef, value: impl Into<Value>) -> Expr {
    Expr::compare(field, CompareOp::Gt, Rhs::Value(value.into()))
}

#[must_use]
pub fn gte(field: FieldRef, value: impl Into<Value>) -> Expr {
    Expr::compare(field, CompareOp::Gte, Rhs::Value(value.into()))
}

#[must_use]
pub fn in_(field: FieldRef, values: Vec<Value>) -> Expr {
    Expr::compare(field, CompareOp::In, Rhs::List(values))
}

#[must_use]
pub fn not_in(field: FieldRef, values: Vec<Value>) -> Expr {
    Expr::compare(field, CompareOp::NotIn, Rhs::List(values))
}

#[must_use]
pub fn is_null(field: FieldRef) -> Expr {
    Expr::compare(field, CompareOp::Is, Rhs::Value(Value::Null))
}

#[must_use]
pub fn is_not_null(field: FieldRef) -> Expr {
    Expr::compare(field, CompareOp::IsNot, Rhs::Value(Value::Null))
}

#[must_use]
pub fn like(field: FieldRef, pattern: &str) -> Expr {
    Expr::compare(field, CompareOp::Like, Rhs::Value(Value::Text(pattern.into())))
}

#[must_use]
pub fn ilike(field: FieldRef, pattern: &str) -> Expr {
    Expr::compare(field, CompareOp::Ilike, Rhs::Value(Value::Text(pattern.into())))
}

#[must_use]
pub fn between(field: FieldRef, low: impl Into<Value>, high: impl Into<Value>) -> Expr {
    Expr::compare(field, CompareOp::Between, Rhs::Pair(low.into(), high.into()))
}

#[must_use]
pub fn and_(left: Expr, right: Expr) -> Expr {
    Expr::Composite {
        left: Box::new(left),
        op: BoolOp::And,
        right: Box::new(right),
    }
}

#[must_use]
pub fn or_(left: Expr, right: Expr) -> Expr {
    Expr::Composite {
        left: Box::new(left),
        op: BoolOp::Or,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(field: &str) -> FieldRef {
        FieldRef::new("user", field)
    }

    #[test]
    fn builders_produce_expected_tree() {
        let expr = and_(eq(f("name"), "al"), gt(f("age"), 30));

        let Expr::Composite { left, op, right } = expr else {
            panic!("expected composite");
        };
        assert_eq!(op, BoolOp::And);
        assert_eq!(
            *left,
            Expr::Comparison {
                field: f("name"),
                op: CompareOp::Eq,
                rhs: Rhs::Value(Value::Text("al".into())),
            }
        );
        assert_eq!(
            *right,
            Expr::Comparison {
                field: f("age"),
                op: CompareOp::Gt,
                rhs: Rhs::Value(Value::Int(30)),
            }
        );
    }

    #[test]
    fn null_helpers_use_is_operators() {
        assert_eq!(
            is_null(f("deleted_at")),
            Expr::Comparison {
                field: f("deleted_at"),
                op: CompareOp::Is,
                rhs: Rhs::Value(Value::Null),
            }
        );
        assert_eq!(
            is_not_null(f("deleted_at")),
            Expr::Comparison {
                field: f("deleted_at"),
                op: CompareOp::IsNot,
                rhs: Rhs::Value(Value::Null),
            }
        );
    }
}
