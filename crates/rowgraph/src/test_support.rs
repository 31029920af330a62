//! Scripted store double for exercising execution paths without a backend.

use crate::{
    sql::Statement,
    store::{DataStore, StoreFailure},
    value::Value,
};
use async_trait::async_trait;
use std::{collections::VecDeque, sync::Mutex};

/// Records every issued statement and replays canned responses in order.
#[derive(Default)]
pub struct ScriptedStore {
    statements: Mutex<Vec<Statement>>,
    rows: Mutex<VecDeque<Vec<Vec<Value>>>>,
    returned: Mutex<VecDeque<Vec<Value>>>,
    failure: Mutex<Option<StoreFailure>>,
}

impl ScriptedStore {
    /// Queue a row set for the next `run_query`.
    pub fn push_rows(&self, rows: Vec<Vec<Value>>) {
        self.rows.lock().unwrap().push_back(rows);
    }

    /// Queue returned values for the next `run_operation`.
    pub fn push_returned(&self, values: Vec<Value>) {
        self.returned.lock().unwrap().push_back(values);
    }

    /// Fail the next request with `message`.
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(StoreFailure::new(message));
    }

    /// Statements issued so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, statement: &Statement) -> Result<(), StoreFailure> {
        self.statements.lock().unwrap().push(statement.clone());
        match self.failure.lock().unwrap().take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataStore for ScriptedStore {
    async fn run_query(&self, statement: &Statement) -> Result<Vec<Vec<Value>>, StoreFailure> {
        self.record(statement)?;
        Ok(self.rows.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn run_operation(&self, statement: &Statement) -> Result<Vec<Value>, StoreFailure> {
        self.record(statement)?;
        Ok(self.returned.lock().unwrap().pop_front().unwrap_or_default())
    }
}
