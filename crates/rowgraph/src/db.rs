//! Database handle: the registry, a store, and a dialect bound together.

use crate::{
    error::Error,
    expr::FieldRef,
    model::{ConfigError, SchemaRegistry},
    query::{InsertQuery, SelectQuery, UpdateQuery},
    record::{RecordError, SharedRecord},
    sql::{self, Dialect, Statement},
    store::{DataStore, ExecuteError},
    value::Value,
};
use indexmap::IndexMap;
use std::sync::Arc;

///
/// SensitiveTransform
///
/// Applied to values bound for fields declared sensitive, at the moment
/// they are bound. Plaintext never reaches the store for those fields.
///

pub trait SensitiveTransform: Send + Sync {
    fn apply(&self, value: Value) -> Value;
}

///
/// Db
///
/// Built once at startup around a frozen registry; query execution treats
/// everything here as read-only.
///

pub struct Db {
    registry: SchemaRegistry,
    store: Arc<dyn DataStore>,
    dialect: Dialect,
    transform: Option<Arc<dyn SensitiveTransform>>,
}

impl Db {
    #[must_use]
    pub fn new(registry: SchemaRegistry, store: Arc<dyn DataStore>) -> Self {
        Self {
            registry,
            store,
            dialect: Dialect::default(),
            transform: None,
        }
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn SensitiveTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Reference a declared column for use in filter expressions.
    pub fn col(&self, schema: &str, field: &str) -> Result<FieldRef, ConfigError> {
        let schema = self.registry.require(schema)?;
        if schema.field(field).is_none() {
            return Err(ConfigError::UnknownField {
                schema: schema.name.clone(),
                field: field.to_string(),
            });
        }
        Ok(schema.col(field))
    }

    #[must_use]
    pub fn select(&self, schema: &str) -> SelectQuery<'_> {
        SelectQuery::new(self, schema)
    }

    #[must_use]
    pub fn insert(&self, schema: &str) -> InsertQuery<'_> {
        InsertQuery::new(self, schema)
    }

    #[must_use]
    pub fn update(&self, schema: &str) -> UpdateQuery<'_> {
        UpdateQuery::new(self, schema)
    }

    pub async fn create_table(&self, schema: &str) -> Result<(), Error> {
        let statement = sql::ddl::create_table(&self.registry, self.dialect, schema)?;
        self.run_operation(&statement).await?;
        Ok(())
    }

    pub async fn drop_table(&self, schema: &str) -> Result<(), Error> {
        let statement = sql::ddl::drop_table(&self.registry, self.dialect, schema)?;
        self.run_operation(&statement).await?;
        Ok(())
    }

    /// Create every declared table, in declaration order so referenced
    /// tables exist before their foreign keys.
    pub async fn create_all(&self) -> Result<(), Error> {
        let names: Vec<String> = self.registry.schemas().map(|s| s.name.clone()).collect();
        for name in names {
            self.create_table(&name).await?;
        }
        Ok(())
    }

    /// Link two records through a many-to-many schema. Operands are
    /// reordered to the schema's declared link-field order, so the compiled
    /// statement is canonical regardless of argument order.
    pub async fn add_link(
        &self,
        schema: &str,
        a: &SharedRecord,
        b: &SharedRecord,
    ) -> Result<(), Error> {
        let (first, second) = self.link_pair(schema, a, b)?;
        let statement = sql::dml::add_link(&self.registry, self.dialect, schema, first, second)?;
        self.run_operation(&statement).await?;
        Ok(())
    }

    pub async fn remove_link(
        &self,
        schema: &str,
        a: &SharedRecord,
        b: &SharedRecord,
    ) -> Result<(), Error> {
        let (first, second) = self.link_pair(schema, a, b)?;
        let statement =
            sql::dml::remove_link(&self.registry, self.dialect, schema, first, second)?;
        self.run_operation(&statement).await?;
        Ok(())
    }

    /// Persist a record: update when it already carries a primary key,
    /// otherwise insert and write the generated key back onto it.
    pub async fn save(&self, record: &SharedRecord) -> Result<(), Error> {
        let (schema, values, has_id) = {
            let record = record.borrow();
            let values: IndexMap<String, Value> = record
                .values
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (record.schema.name.clone(), values, record.id().is_some())
        };

        if has_id {
            let values = self.bind_sensitive(&schema, values)?;
            let statement = sql::dml::update(&self.registry, self.dialect, &schema, &values)?;
            self.run_operation(&statement).await?;
        } else {
            let values = self.bind_sensitive(&schema, values)?;
            let statement = sql::dml::insert(&self.registry, self.dialect, &schema, &values)?;
            let returned = self.run_operation(&statement).await?;
            if let Some(id) = returned.into_iter().next() {
                record.borrow_mut().values.insert("id".to_string(), id);
            }
        }
        Ok(())
    }

    pub(crate) async fn run_query(&self, statement: &Statement) -> Result<Vec<Vec<Value>>, Error> {
        log::debug!("query: {}", statement.text);
        self.store
            .run_query(statement)
            .await
            .map_err(|cause| self.execute_error(statement, cause))
    }

    pub(crate) async fn run_operation(&self, statement: &Statement) -> Result<Vec<Value>, Error> {
        log::debug!("operation: {}", statement.text);
        self.store
            .run_operation(statement)
            .await
            .map_err(|cause| self.execute_error(statement, cause))
    }

    /// Route values bound for sensitive fields through the configured
    /// transform.
    pub(crate) fn bind_sensitive(
        &self,
        schema: &str,
        values: IndexMap<String, Value>,
    ) -> Result<IndexMap<String, Value>, Error> {
        let Some(transform) = &self.transform else {
            return Ok(values);
        };
        let schema = self.registry.require(schema)?;
        Ok(values
            .into_iter()
            .map(|(name, value)| {
                let sensitive = schema.field(&name).is_some_and(|f| f.sensitive);
                let value = if sensitive {
                    transform.apply(value)
                } else {
                    value
                };
                (name, value)
            })
            .collect())
    }

    fn execute_error(&self, statement: &Statement, cause: crate::store::StoreFailure) -> Error {
        log::error!("statement failed: {} ({})", cause, statement.text);
        Error::Execute(ExecuteError {
            statement: statement.text.clone(),
            cause,
        })
    }

    /// Extract the two link keys in the schema's declared field order.
    fn link_pair(
        &self,
        schema: &str,
        a: &SharedRecord,
        b: &SharedRecord,
    ) -> Result<(Value, Value), Error> {
        let link = self.registry.require(schema)?;
        if !link.many_to_many {
            return Err(ConfigError::NotManyToMany {
                schema: link.name.clone(),
            }
            .into());
        }

        let position = |record: &SharedRecord| -> Result<(usize, Value), Error> {
            let record = record.borrow();
            let pos = link.link_position(&record.schema.name).ok_or_else(|| {
                ConfigError::NotLinked {
                    schema: link.name.clone(),
                    value: record.schema.name.clone(),
                }
            })?;
            let id = record
                .id()
                .cloned()
                .ok_or_else(|| RecordError::MissingPeerKey {
                    schema: record.schema.name.clone(),
                })?;
            Ok((pos, id))
        };

        let (pos_a, id_a) = position(a)?;
        let (pos_b, id_b) = position(b)?;
        if pos_a <= pos_b {
            Ok((id_a, id_b))
        } else {
            Ok((id_b, id_a))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{FieldDecl, SchemaDecl},
        record::Record,
        test_support::ScriptedStore,
    };
    use std::rc::Rc;

    fn linked_db(store: Arc<ScriptedStore>) -> Db {
        let mut registry = SchemaRegistry::new();
        registry
            .declare(
                SchemaDecl::new("user")
                    .field(FieldDecl::char("name", 50))
                    .field(FieldDecl::char("token", 64).sensitive()),
            )
            .unwrap();
        registry
            .declare(SchemaDecl::new("group").field(FieldDecl::char("title", 40)))
            .unwrap();
        registry
            .declare(
                SchemaDecl::link_table("membership")
                    .field(FieldDecl::foreign_key("user", "user"))
                    .field(FieldDecl::foreign_key("group", "group")),
            )
            .unwrap();
        Db::new(registry, store)
    }

    fn saved(db: &Db, schema: &str, id: i64) -> SharedRecord {
        let schema = Rc::new(db.registry().get(schema).unwrap().clone());
        let mut record = Record::new(schema);
        record.set("id", id).unwrap();
        record.shared()
    }

    #[tokio::test]
    async fn add_link_canonicalizes_operand_order() {
        let store = Arc::new(ScriptedStore::default());
        store.push_returned(Vec::new());
        store.push_returned(Vec::new());
        let db = linked_db(Arc::clone(&store));

        let user = saved(&db, "user", 1);
        let group = saved(&db, "group", 9);

        // Both argument orders compile to the same statement.
        db.add_link("membership", &user, &group).await.unwrap();
        db.add_link("membership", &group, &user).await.unwrap();

        let issued = store.statements();
        assert_eq!(issued[0], issued[1]);
        assert_eq!(issued[0].params[0], Value::Int(1));
        assert_eq!(issued[0].params[1], Value::Int(9));
    }

    #[tokio::test]
    async fn linking_an_unrelated_schema_is_fatal() {
        let store = Arc::new(ScriptedStore::default());
        let db = linked_db(Arc::clone(&store));

        let user = saved(&db, "user", 1);
        let other = saved(&db, "user", 2);
        // A user/user pair cannot satisfy the user/group link table.
        let group = saved(&db, "group", 9);
        db.add_link("membership", &user, &group).await.ok();

        let err = db.add_link("user", &user, &other).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::NotManyToMany { .. })
        ));
    }

    #[tokio::test]
    async fn save_inserts_then_carries_the_generated_key() {
        let store = Arc::new(ScriptedStore::default());
        store.push_returned(vec![Value::Int(42)]);
        store.push_returned(Vec::new());
        let db = linked_db(Arc::clone(&store));

        let schema = Rc::new(db.registry().get("user").unwrap().clone());
        let mut fresh = Record::new(schema);
        fresh.set("name", "Al").unwrap();
        let record = fresh.shared();

        db.save(&record).await.unwrap();
        assert_eq!(record.borrow().id(), Some(&Value::Int(42)));

        // Second save updates in place.
        record.borrow_mut().set("name", "Bo").unwrap();
        db.save(&record).await.unwrap();

        let issued = store.statements();
        assert!(issued[0].text.starts_with("INSERT INTO"));
        assert!(issued[1].text.starts_with("UPDATE"));
    }

    #[tokio::test]
    async fn sensitive_fields_are_transformed_at_bind_time() {
        struct Redact;
        impl SensitiveTransform for Redact {
            fn apply(&self, _: Value) -> Value {
                Value::Text("sealed".to_string())
            }
        }

        let store = Arc::new(ScriptedStore::default());
        store.push_returned(vec![Value::Int(1)]);
        let db = linked_db(Arc::clone(&store)).with_transform(Arc::new(Redact));

        db.insert("user")
            .value("name", "Al")
            .value("token", "hunter2")
            .execute()
            .await
            .unwrap();

        let issued = store.statements();
        assert_eq!(
            issued[0].params,
            vec![
                Value::Text("Al".into()),
                Value::Text("sealed".into()),
            ]
        );
    }

    #[tokio::test]
    async fn store_failures_surface_with_the_statement() {
        let store = Arc::new(ScriptedStore::default());
        store.fail_next("connection reset");
        let db = linked_db(Arc::clone(&store));

        let err = db.select("user").execute().await.unwrap_err();
        let Error::Execute(err) = err else {
            panic!("expected an execute error");
        };
        assert_eq!(err.cause.message, "connection reset");
        assert!(err.statement.starts_with("SELECT"));
    }
}
