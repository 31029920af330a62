//! Fluent, side-effect-free query assembly.
//!
//! Builders collect a target schema, filters, joins, and mutation values;
//! nothing touches the store until `execute`, which issues exactly one
//! request. A consumed builder cannot be re-executed.

use crate::{
    db::Db,
    error::Error,
    expr::{and_, Expr, FieldRef},
    hydrate::Hydrated,
    sql,
    value::Value,
};
use indexmap::IndexMap;

///
/// JoinKind
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
}

/// Explicit join condition, overriding the declared relation between the
/// joined schemas.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OnClause {
    pub left: FieldRef,
    pub right: FieldRef,
}

///
/// Join
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Join {
    pub src: String,
    pub dest: String,
    pub kind: JoinKind,
    pub on: Option<OnClause>,
}

/// Where-clause source: a compiled expression tree, or raw predicate text
/// passed through verbatim with no bound parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Filter {
    Expr(Expr),
    Raw(String),
}

///
/// SelectQuery
///
/// Joins advance a cursor: each `join` hangs off the previous destination,
/// and `switch` rebinds the cursor without joining, so a chain can branch
/// back to an earlier schema.
///

pub struct SelectQuery<'a> {
    db: &'a Db,
    schema: String,
    cursor: String,
    joins: Vec<Join>,
    filter: Option<Expr>,
    raw: Option<String>,
}

impl<'a> SelectQuery<'a> {
    pub(crate) fn new(db: &'a Db, schema: &str) -> Self {
        Self {
            db,
            schema: schema.to_string(),
            cursor: schema.to_string(),
            joins: Vec::new(),
            filter: None,
            raw: None,
        }
    }

    /// AND a predicate onto the filter.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(prev) => and_(prev, expr),
            None => expr,
        });
        self
    }

    /// Set raw predicate text. Binds nothing; the caller owns its safety.
    /// Exclusive with `filter`: setting both fails at compile time.
    #[must_use]
    pub fn filter_raw(mut self, text: &str) -> Self {
        self.raw = Some(text.to_string());
        self
    }

    /// Left-join `dest` off the cursor and advance the cursor to it.
    #[must_use]
    pub fn join(self, dest: &str) -> Self {
        self.push_join(dest, JoinKind::Left, None)
    }

    #[must_use]
    pub fn inner_join(self, dest: &str) -> Self {
        self.push_join(dest, JoinKind::Inner, None)
    }

    /// Join with an explicit condition instead of the declared relation.
    #[must_use]
    pub fn join_on(self, dest: &str, on: OnClause) -> Self {
        self.push_join(dest, JoinKind::Left, Some(on))
    }

    /// Rebind the join cursor without adding a join.
    #[must_use]
    pub fn switch(mut self, schema: &str) -> Self {
        self.cursor = schema.to_string();
        self
    }

    /// Mark this query delete-returning instead of row-returning.
    #[must_use]
    pub fn delete(self) -> DeleteQuery<'a> {
        DeleteQuery { inner: self }
    }

    /// Compile, run the single store request, and hydrate the result graph.
    pub async fn execute(self) -> Result<Hydrated, Error> {
        let filter = self.build_filter()?;
        let statement = sql::select::select(
            self.db.registry(),
            self.db.dialect(),
            &self.schema,
            &self.joins,
            filter.as_ref(),
        )?;
        let rows = self.db.run_query(&statement).await?;
        let hydrated = crate::hydrate::hydrate(
            self.db.registry(),
            &self.schema,
            &self.joins,
            &rows,
        )?;
        Ok(hydrated)
    }

    /// Resolve the filter surface; carrying both an expression and a raw
    /// fragment is rejected rather than one silently winning.
    fn build_filter(&self) -> Result<Option<Filter>, sql::CompileError> {
        match (&self.filter, &self.raw) {
            (Some(_), Some(_)) => Err(sql::CompileError::MixedFilters),
            (Some(expr), None) => Ok(Some(Filter::Expr(expr.clone()))),
            (None, Some(text)) => Ok(Some(Filter::Raw(text.clone()))),
            (None, None) => Ok(None),
        }
    }

    fn push_join(mut self, dest: &str, kind: JoinKind, on: Option<OnClause>) -> Self {
        self.joins.push(Join {
            src: self.cursor.clone(),
            dest: dest.to_string(),
            kind,
            on,
        });
        self.cursor = dest.to_string();
        self
    }
}

///
/// DeleteQuery
///
/// A delete-marked select. Joins are rejected at compile time; the filter
/// surface is the same.
///

pub struct DeleteQuery<'a> {
    inner: SelectQuery<'a>,
}

impl DeleteQuery<'_> {
    /// Run the delete; returns the primary keys of the deleted rows when the
    /// schema declares one, otherwise an empty list.
    pub async fn execute(self) -> Result<Vec<Value>, Error> {
        let query = self.inner;
        let filter = query.build_filter()?;
        let statement = sql::select::delete(
            query.db.registry(),
            query.db.dialect(),
            &query.schema,
            &query.joins,
            filter.as_ref(),
        )?;
        let deleted = query.db.run_operation(&statement).await?;
        Ok(deleted)
    }
}

///
/// InsertQuery
///

pub struct InsertQuery<'a> {
    db: &'a Db,
    schema: String,
    values: IndexMap<String, Value>,
}

impl<'a> InsertQuery<'a> {
    pub(crate) fn new(db: &'a Db, schema: &str) -> Self {
        Self {
            db,
            schema: schema.to_string(),
            values: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn value(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn values(mut self, values: IndexMap<String, Value>) -> Self {
        self.values.extend(values);
        self
    }

    /// Run the insert; returns the generated primary key when the schema
    /// declares one.
    pub async fn execute(self) -> Result<Option<Value>, Error> {
        let values = self.db.bind_sensitive(&self.schema, self.values)?;
        let statement =
            sql::dml::insert(self.db.registry(), self.db.dialect(), &self.schema, &values)?;
        let returned = self.db.run_operation(&statement).await?;
        Ok(returned.into_iter().next())
    }
}

///
/// UpdateQuery
///
/// Locates the row by the primary key carried in the value map; compiling
/// without one is a fatal configuration error.
///

pub struct UpdateQuery<'a> {
    db: &'a Db,
    schema: String,
    values: IndexMap<String, Value>,
}

impl<'a> UpdateQuery<'a> {
    pub(crate) fn new(db: &'a Db, schema: &str) -> Self {
        Self {
            db,
            schema: schema.to_string(),
            values: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn value(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn values(mut self, values: IndexMap<String, Value>) -> Self {
        self.values.extend(values);
        self
    }

    pub async fn execute(self) -> Result<(), Error> {
        let values = self.db.bind_sensitive(&self.schema, self.values)?;
        let statement =
            sql::dml::update(self.db.registry(), self.db.dialect(), &self.schema, &values)?;
        self.db.run_operation(&statement).await?;
        Ok(())
    }
}
