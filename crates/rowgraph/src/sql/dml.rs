use crate::{
    model::{ConfigError, FieldKind, RecordSchema, SchemaRegistry},
    sql::{CompileError, Dialect, ParamSink, Statement},
    value::Value,
};
use indexmap::IndexMap;

/// Render an INSERT for `values`, columns in schema order. The value map
/// never carries the primary key; the statement returns it instead when the
/// schema declares one.
pub fn insert(
    registry: &SchemaRegistry,
    dialect: Dialect,
    schema: &str,
    values: &IndexMap<String, Value>,
) -> Result<Statement, CompileError> {
    let schema = registry.require(schema)?;
    check_known_fields(schema, values)?;

    let columns = ordered_columns(schema, values, true);
    if columns.is_empty() {
        return Err(CompileError::EmptyValues {
            schema: schema.name.clone(),
        });
    }

    let mut sink = ParamSink::new(dialect);
    let quoted: Vec<String> = columns.iter().map(|c| dialect.quote(c)).collect();
    let placeholders: Vec<String> = columns
        .iter()
        .map(|c| sink.bind(values[c.as_str()].clone()))
        .collect();

    let mut text = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote(&schema.table),
        quoted.join(", "),
        placeholders.join(", ")
    );

    if !schema.on_conflict.is_empty() {
        let conflict: Vec<String> = schema.on_conflict.iter().map(|c| dialect.quote(c)).collect();
        // Values are bound a second time; MySQL placeholders are positional.
        let update: Vec<String> = columns
            .iter()
            .map(|c| sink.bind(values[c.as_str()].clone()))
            .collect();
        text.push_str(&format!(
            " ON CONFLICT ({}) DO UPDATE SET ({})=({})",
            conflict.join(", "),
            quoted.join(", "),
            update.join(", ")
        ));
    }

    if schema.primary_key {
        text.push_str(" RETURNING id");
    }
    text.push(';');

    Ok(Statement::new(text, sink.into_params()))
}

/// Render an UPDATE located by the primary key carried in the value map.
pub fn update(
    registry: &SchemaRegistry,
    dialect: Dialect,
    schema: &str,
    values: &IndexMap<String, Value>,
) -> Result<Statement, CompileError> {
    let schema = registry.require(schema)?;
    if !schema.primary_key {
        return Err(ConfigError::NoPrimaryKey {
            schema: schema.name.clone(),
        }
        .into());
    }
    let Some(id) = values.get("id").filter(|v| !v.is_null()) else {
        return Err(ConfigError::MissingPrimaryKeyValue {
            schema: schema.name.clone(),
        }
        .into());
    };
    check_known_fields(schema, values)?;

    let columns = ordered_columns(schema, values, true);
    if columns.is_empty() {
        return Err(CompileError::EmptyValues {
            schema: schema.name.clone(),
        });
    }

    let mut sink = ParamSink::new(dialect);
    let quoted: Vec<String> = columns.iter().map(|c| dialect.quote(c)).collect();
    let placeholders: Vec<String> = columns
        .iter()
        .map(|c| sink.bind(values[c.as_str()].clone()))
        .collect();
    let id_placeholder = sink.bind(id.clone());

    let mut text = format!(
        "UPDATE {} SET ({})=({}) WHERE id = {id_placeholder}",
        dialect.quote(&schema.table),
        quoted.join(", "),
        placeholders.join(", ")
    );
    text.push_str(" RETURNING id;");

    Ok(Statement::new(text, sink.into_params()))
}

/// Render the guarded link INSERT for a many-to-many pair, already in the
/// link table's declared field order.
pub fn add_link(
    registry: &SchemaRegistry,
    dialect: Dialect,
    schema: &str,
    first: Value,
    second: Value,
) -> Result<Statement, CompileError> {
    let (schema, (a, b)) = require_link_table(registry, schema)?;
    let (col_a, col_b) = (dialect.quote(&a.name), dialect.quote(&b.name));
    let table = dialect.quote(&schema.table);

    let mut sink = ParamSink::new(dialect);
    let p1 = sink.bind(first.clone());
    let p2 = sink.bind(second.clone());
    let p3 = sink.bind(first);
    let p4 = sink.bind(second);

    let text = format!(
        "INSERT INTO {table} ({col_a}, {col_b}) SELECT {p1}, {p2} \
         WHERE NOT EXISTS (SELECT {col_a} FROM {table} WHERE {col_a} = {p3} AND {col_b} = {p4});"
    );
    Ok(Statement::new(text, sink.into_params()))
}

/// Render the link DELETE for a many-to-many pair in declared field order.
pub fn remove_link(
    registry: &SchemaRegistry,
    dialect: Dialect,
    schema: &str,
    first: Value,
    second: Value,
) -> Result<Statement, CompileError> {
    let (schema, (a, b)) = require_link_table(registry, schema)?;
    let table = dialect.quote(&schema.table);

    let mut sink = ParamSink::new(dialect);
    let p1 = sink.bind(first);
    let p2 = sink.bind(second);

    let text = format!(
        "DELETE FROM {table} WHERE {} = {p1} AND {} = {p2};",
        dialect.quote(&a.name),
        dialect.quote(&b.name)
    );
    Ok(Statement::new(text, sink.into_params()))
}

type LinkTable<'a> = (
    &'a RecordSchema,
    (&'a crate::model::FieldModel, &'a crate::model::FieldModel),
);

fn require_link_table<'a>(
    registry: &'a SchemaRegistry,
    schema: &str,
) -> Result<LinkTable<'a>, CompileError> {
    let schema = registry.require(schema)?;
    let Some(pair) = schema.link_fields().filter(|_| schema.many_to_many) else {
        return Err(ConfigError::NotManyToMany {
            schema: schema.name.clone(),
        }
        .into());
    };
    Ok((schema, pair))
}

fn check_known_fields(
    schema: &RecordSchema,
    values: &IndexMap<String, Value>,
) -> Result<(), CompileError> {
    for name in values.keys() {
        if schema.field(name).is_none() {
            return Err(ConfigError::UnknownField {
                schema: schema.name.clone(),
                field: name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Value-map columns in canonical schema order, optionally excluding the
/// primary key.
fn ordered_columns(
    schema: &RecordSchema,
    values: &IndexMap<String, Value>,
    exclude_primary_key: bool,
) -> Vec<String> {
    schema
        .fields
        .values()
        .filter(|f| values.contains_key(&f.name))
        .filter(|f| !(exclude_primary_key && matches!(f.kind, FieldKind::PrimaryKey)))
        .map(|f| f.name.clone())
        .collect()
}
