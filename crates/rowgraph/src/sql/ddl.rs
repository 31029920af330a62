use crate::{
    model::{FieldKind, FieldModel, SchemaRegistry},
    sql::{CompileError, Dialect, Statement},
};

/// Render `CREATE TABLE` DDL for a declared schema, columns in canonical
/// field order.
pub fn create_table(
    registry: &SchemaRegistry,
    dialect: Dialect,
    schema: &str,
) -> Result<Statement, CompileError> {
    let schema = registry.require(schema)?;

    let mut defs: Vec<String> = Vec::with_capacity(schema.width());
    for field in schema.fields.values() {
        defs.push(column_def(registry, dialect, field)?);
    }
    for group in &schema.unique {
        let cols: Vec<String> = group.iter().map(|c| dialect.quote(c)).collect();
        defs.push(format!("UNIQUE ({})", cols.join(", ")));
    }

    let text = format!(
        "CREATE TABLE {} ( {} );",
        dialect.quote(&schema.table),
        defs.join(", ")
    );
    Ok(Statement::new(text, Vec::new()))
}

/// Render `DROP TABLE IF EXISTS ... CASCADE` for a declared schema.
pub fn drop_table(
    registry: &SchemaRegistry,
    dialect: Dialect,
    schema: &str,
) -> Result<Statement, CompileError> {
    let schema = registry.require(schema)?;
    let text = format!("DROP TABLE IF EXISTS {} CASCADE;", dialect.quote(&schema.table));
    Ok(Statement::new(text, Vec::new()))
}

fn column_def(
    registry: &SchemaRegistry,
    dialect: Dialect,
    field: &FieldModel,
) -> Result<String, CompileError> {
    let name = dialect.quote(&field.name);

    let mut def = match &field.kind {
        FieldKind::PrimaryKey => {
            let ty = match dialect {
                Dialect::Postgres => "serial PRIMARY KEY",
                Dialect::MySql => "int NOT NULL AUTO_INCREMENT PRIMARY KEY",
            };
            return Ok(format!("{name} {ty}"));
        }
        FieldKind::ForeignKey {
            peer,
            references,
            on_delete_cascade,
            on_update_cascade,
        } => {
            let peer_schema = registry.require(peer)?;
            // Registry validation guarantees the referenced column exists.
            let referenced = &peer_schema.fields[references.as_str()];
            let ty = scalar_type(dialect, &referenced.kind);
            let mut def = format!(
                "{name} {ty} REFERENCES {}({})",
                dialect.quote(&peer_schema.table),
                dialect.quote(references)
            );
            if *on_delete_cascade {
                def.push_str(" ON DELETE CASCADE");
            }
            if *on_update_cascade {
                def.push_str(" ON UPDATE CASCADE");
            }
            def
        }
        kind => format!("{name} {}", scalar_type(dialect, kind)),
    };

    if !field.nullable {
        def.push_str(" NOT NULL");
    }
    if field.unique {
        def.push_str(" UNIQUE");
    }

    Ok(def)
}

fn scalar_type(dialect: Dialect, kind: &FieldKind) -> String {
    match kind {
        FieldKind::Bool => "bool".to_string(),
        FieldKind::Char { max_length } => format!("varchar({max_length})"),
        // Keys referencing a serial column are stored as plain ints.
        FieldKind::Int | FieldKind::PrimaryKey | FieldKind::ForeignKey { .. } => "int".to_string(),
        FieldKind::Float => "float".to_string(),
        FieldKind::Date => "timestamp".to_string(),
        FieldKind::Json => match dialect {
            Dialect::Postgres => "jsonb".to_string(),
            Dialect::MySql => "json".to_string(),
        },
    }
}
