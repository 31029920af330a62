use crate::{
    expr::{CompareOp, Expr, FieldRef, Rhs},
    model::{ConfigError, SchemaRegistry},
    sql::{CompileError, Dialect, ParamSink},
    value::Value,
};

/// Render an expression tree to predicate text, binding every literal through
/// the sink. Boolean composites parenthesize the whole combination.
pub(crate) fn render_expr(
    registry: &SchemaRegistry,
    dialect: Dialect,
    expr: &Expr,
    sink: &mut ParamSink,
) -> Result<String, CompileError> {
    match expr {
        Expr::Composite { left, op, right } => {
            let left = render_expr(registry, dialect, left, sink)?;
            let right = render_expr(registry, dialect, right, sink)?;
            Ok(format!("({left} {op} {right})"))
        }
        Expr::Comparison { field, op, rhs } => {
            let column = resolve_column(registry, dialect, field)?;
            render_comparison(&column, *op, rhs, field, sink)
        }
    }
}

pub(crate) fn resolve_column(
    registry: &SchemaRegistry,
    dialect: Dialect,
    field: &FieldRef,
) -> Result<String, CompileError> {
    let schema = registry.require(&field.schema)?;
    if schema.field(&field.field).is_none() {
        return Err(ConfigError::UnknownField {
            schema: field.schema.clone(),
            field: field.field.clone(),
        }
        .into());
    }
    Ok(dialect.column(&schema.table, &field.field))
}

fn render_comparison(
    column: &str,
    op: CompareOp,
    rhs: &Rhs,
    field: &FieldRef,
    sink: &mut ParamSink,
) -> Result<String, CompileError> {
    match (op, rhs) {
        // NULL-aware equality: never emit `= NULL`.
        (CompareOp::Eq | CompareOp::Is, Rhs::Value(Value::Null)) => Ok(format!("{column} IS NULL")),
        (CompareOp::Ne | CompareOp::IsNot, Rhs::Value(Value::Null)) => {
            Ok(format!("{column} IS NOT NULL"))
        }

        (CompareOp::Is | CompareOp::IsNot, Rhs::Value(Value::Bool(b))) => {
            let truth = if *b { "TRUE" } else { "FALSE" };
            Ok(format!("{column} {op} {truth}"))
        }
        (CompareOp::Is | CompareOp::IsNot, _) => Err(CompileError::OperandMismatch { op }),

        (
            CompareOp::Eq
            | CompareOp::Ne
            | CompareOp::Lt
            | CompareOp::Lte
            | CompareOp::Gt
            | CompareOp::Gte
            | CompareOp::Like
            | CompareOp::Ilike,
            Rhs::Value(value),
        ) => {
            let placeholder = sink.bind(value.clone());
            Ok(format!("{column} {op} {placeholder}"))
        }

        (CompareOp::In | CompareOp::NotIn, Rhs::List(values)) => {
            if values.is_empty() {
                return Err(CompileError::EmptyInList {
                    field: field.field.clone(),
                });
            }
            let placeholders: Vec<String> =
                values.iter().map(|v| sink.bind(v.clone())).collect();
            Ok(format!("{column} {op} ({})", placeholders.join(", ")))
        }

        (CompareOp::Between, Rhs::Pair(low, high)) => {
            let low = sink.bind(low.clone());
            let high = sink.bind(high.clone());
            Ok(format!("{column} BETWEEN {low} AND {high}"))
        }

        _ => Err(CompileError::OperandMismatch { op }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::{and_, between, eq, gt, ilike, in_, is_null, ne, or_},
        model::{FieldDecl, SchemaDecl},
    };

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .declare(
                SchemaDecl::new("user")
                    .field(FieldDecl::char("name", 50))
                    .field(FieldDecl::int("age")),
            )
            .unwrap();
        registry
    }

    fn render(expr: &Expr) -> Result<(String, Vec<Value>), CompileError> {
        let registry = registry();
        let mut sink = ParamSink::new(Dialect::Postgres);
        let text = render_expr(&registry, Dialect::Postgres, expr, &mut sink)?;
        Ok((text, sink.into_params()))
    }

    fn user(field: &str) -> FieldRef {
        FieldRef::new("user", field)
    }

    #[test]
    fn equality_binds_a_parameter() {
        let (text, params) = render(&eq(user("name"), "al")).unwrap();
        assert_eq!(text, r#""user"."name" = $1"#);
        assert_eq!(params, vec![Value::Text("al".into())]);
    }

    #[test]
    fn eq_null_compiles_to_is_null() {
        let (text, params) = render(&eq(user("name"), Value::Null)).unwrap();
        assert_eq!(text, r#""user"."name" IS NULL"#);
        assert!(params.is_empty());

        let (text, _) = render(&is_null(user("name"))).unwrap();
        assert_eq!(text, r#""user"."name" IS NULL"#);
    }

    #[test]
    fn ne_null_compiles_to_is_not_null() {
        let (text, params) = render(&ne(user("name"), Value::Null)).unwrap();
        assert_eq!(text, r#""user"."name" IS NOT NULL"#);
        assert!(params.is_empty());
    }

    #[test]
    fn list_operand_becomes_in_list() {
        let (text, params) = render(&in_(
            user("age"),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        ))
        .unwrap();
        assert_eq!(text, r#""user"."age" IN ($1, $2, $3)"#);
        assert_eq!(params, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn empty_in_list_is_a_compile_error() {
        let err = render(&in_(user("age"), vec![])).unwrap_err();
        assert_eq!(
            err,
            CompileError::EmptyInList {
                field: "age".to_string(),
            }
        );
    }

    #[test]
    fn composites_parenthesize_both_sides() {
        let expr = or_(
            and_(eq(user("name"), "al"), gt(user("age"), 30)),
            is_null(user("name")),
        );
        let (text, params) = render(&expr).unwrap();
        assert_eq!(
            text,
            r#"(("user"."name" = $1 AND "user"."age" > $2) OR "user"."name" IS NULL)"#
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn between_binds_both_bounds() {
        let (text, params) = render(&between(user("age"), 18, 65)).unwrap();
        assert_eq!(text, r#""user"."age" BETWEEN $1 AND $2"#);
        assert_eq!(params, vec![Value::Int(18), Value::Int(65)]);
    }

    #[test]
    fn ilike_binds_pattern() {
        let (text, params) = render(&ilike(user("name"), "a%")).unwrap();
        assert_eq!(text, r#""user"."name" ILIKE $1"#);
        assert_eq!(params, vec![Value::Text("a%".into())]);
    }

    #[test]
    fn unknown_field_is_a_compile_error() {
        let err = render(&eq(user("missing"), 1)).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Config(ConfigError::UnknownField { .. })
        ));
    }

    #[test]
    fn between_rejects_scalar_operand() {
        let expr = Expr::Comparison {
            field: user("age"),
            op: CompareOp::Between,
            rhs: Rhs::Value(Value::Int(1)),
        };
        assert_eq!(
            render(&expr).unwrap_err(),
            CompileError::OperandMismatch {
                op: CompareOp::Between,
            }
        );
    }
}
