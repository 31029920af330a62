use crate::{
    model::{FieldKind, RecordSchema, SchemaRegistry},
    query::{Filter, Join, JoinKind},
    sql::{
        filter::{render_expr, resolve_column},
        CompileError, Dialect, ParamSink, Statement,
    },
};

/// Compile a SELECT over the root schema and its join chain. Columns are
/// always `*` so joined rows arrive as fixed-width slices in declaration
/// order, which is what hydration consumes.
pub fn select(
    registry: &SchemaRegistry,
    dialect: Dialect,
    schema: &str,
    joins: &[Join],
    filter: Option<&Filter>,
) -> Result<Statement, CompileError> {
    let root = registry.require(schema)?;

    let mut sink = ParamSink::new(dialect);
    let mut text = format!("SELECT * FROM {}", dialect.quote(&root.table));
    for join in joins {
        text.push(' ');
        text.push_str(&join_clause(registry, dialect, join)?);
    }
    if let Some(clause) = where_clause(registry, dialect, filter, &mut sink)? {
        text.push_str(&clause);
    }
    text.push(';');

    Ok(Statement::new(text, sink.into_params()))
}

/// Compile a DELETE with the same filter surface as SELECT. Joins are
/// rejected: multi-table deletes are not portable and the row slices a
/// join produces have no meaning for a delete.
pub fn delete(
    registry: &SchemaRegistry,
    dialect: Dialect,
    schema: &str,
    joins: &[Join],
    filter: Option<&Filter>,
) -> Result<Statement, CompileError> {
    if !joins.is_empty() {
        return Err(CompileError::DeleteWithJoins);
    }
    let root = registry.require(schema)?;

    let mut sink = ParamSink::new(dialect);
    let mut text = format!("DELETE FROM {}", dialect.quote(&root.table));
    if let Some(clause) = where_clause(registry, dialect, filter, &mut sink)? {
        text.push_str(&clause);
    }
    if root.primary_key {
        text.push_str(" RETURNING id");
    }
    text.push(';');

    Ok(Statement::new(text, sink.into_params()))
}

fn where_clause(
    registry: &SchemaRegistry,
    dialect: Dialect,
    filter: Option<&Filter>,
    sink: &mut ParamSink,
) -> Result<Option<String>, CompileError> {
    let Some(filter) = filter else {
        return Ok(None);
    };
    let predicate = match filter {
        Filter::Expr(expr) => render_expr(registry, dialect, expr, sink)?,
        // Raw text is the caller's escape hatch; it binds nothing.
        Filter::Raw(text) => text.clone(),
    };
    Ok(Some(format!(" WHERE {predicate}")))
}

fn join_clause(
    registry: &SchemaRegistry,
    dialect: Dialect,
    join: &Join,
) -> Result<String, CompileError> {
    let src = registry.require(&join.src)?;
    let dest = registry.require(&join.dest)?;

    let keyword = match join.kind {
        JoinKind::Inner => "INNER JOIN",
        JoinKind::Left => "LEFT JOIN",
    };

    let condition = if let Some(on) = &join.on {
        format!(
            "{} = {}",
            resolve_column(registry, dialect, &on.left)?,
            resolve_column(registry, dialect, &on.right)?,
        )
    } else {
        relation_condition(dialect, src, dest)?
    };

    Ok(format!(
        "{keyword} {} ON ({condition})",
        dialect.quote(&dest.table)
    ))
}

/// Join condition derived from the declared foreign key between the two
/// schemas, whichever side holds it.
fn relation_condition(
    dialect: Dialect,
    src: &RecordSchema,
    dest: &RecordSchema,
) -> Result<String, CompileError> {
    if let Some((holder, peer, relation)) = src
        .relation_to(&dest.name)
        .map(|r| (src, dest, r))
        .or_else(|| dest.relation_to(&src.name).map(|r| (dest, src, r)))
    {
        let Some(FieldKind::ForeignKey { references, .. }) =
            holder.field(&relation.field).map(|f| &f.kind)
        else {
            return Err(CompileError::NoRelation {
                src: src.name.clone(),
                dest: dest.name.clone(),
            });
        };
        return Ok(format!(
            "{} = {}",
            dialect.column(&holder.table, &relation.field),
            dialect.column(&peer.table, references),
        ));
    }

    Err(CompileError::NoRelation {
        src: src.name.clone(),
        dest: dest.name.clone(),
    })
}
