use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::Mutex,
};

use async_trait::async_trait;
use serde_json::{Map, Value};

use schema_grid::{
    engine::{QueryState, RecordRow, SortDirection, TableSchema},
    error::GatewayError,
    gateway::Gateway,
};

/// An in-memory backend with the same filter, sort and paging rules the HTTP backend applies.
pub struct FakeGateway {
    schemas: Vec<TableSchema>,
    tables: Mutex<BTreeMap<String, Vec<RecordRow>>>,
    next_failure: Mutex<Option<GatewayError>>,
    pub list_calls: Mutex<Vec<(QueryState, u32)>>,
    pub update_calls: Mutex<Vec<(Value, Map<String, Value>)>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            schemas: vec![],
            tables: Mutex::new(BTreeMap::new()),
            next_failure: Mutex::new(None),
            list_calls: Mutex::new(vec![]),
            update_calls: Mutex::new(vec![]),
        }
    }

    pub fn with_table(mut self, schema: TableSchema, rows: Vec<RecordRow>) -> Self {
        self.tables.get_mut().unwrap().insert(schema.name.clone(), rows);
        self.schemas.push(schema);
        self
    }

    /// The next call of any kind fails with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        *self.next_failure.lock().unwrap() = Some(error);
    }

    pub fn stored(&self, table: &str) -> Vec<RecordRow> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }

    pub fn last_list(&self) -> Option<(QueryState, u32)> {
        self.list_calls.lock().unwrap().last().cloned()
    }

    /// The key and values of the most recent update, as the backend received them.
    pub fn last_update(&self) -> Option<(Value, Map<String, Value>)> {
        self.update_calls.lock().unwrap().last().cloned()
    }

    fn take_failure(&self) -> Result<(), GatewayError> {
        match self.next_failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn key_column(&self, table: &str) -> Result<String, GatewayError> {
        self.schemas
            .iter()
            .find(|s| s.name == table)
            .and_then(|s| s.primary_key())
            .map(|c| c.name.clone())
            .ok_or_else(|| GatewayError::Backend(format!("table {table} has no primary key")))
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            a.as_f64().unwrap_or_default().partial_cmp(&b.as_f64().unwrap_or_default()).unwrap_or(Ordering::Equal)
        },
        (Some(a), Some(b)) => cell_text(a).cmp(&cell_text(b)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn tables(&self) -> Result<Vec<TableSchema>, GatewayError> {
        self.take_failure()?;
        Ok(self.schemas.clone())
    }

    async fn list(&self, query: &QueryState, limit: u32) -> Result<Vec<RecordRow>, GatewayError> {
        self.list_calls.lock().unwrap().push((query.clone(), limit));
        self.take_failure()?;

        let tables = self.tables.lock().unwrap();
        let rows = tables
            .get(&query.table_name)
            .ok_or_else(|| GatewayError::Backend(format!("unknown table {}", query.table_name)))?;

        let mut rows: Vec<RecordRow> = match &query.filter_text {
            Some(filter) => {
                let needle = filter.to_lowercase();
                rows.iter()
                    .filter(|row| row.values().any(|v| !v.is_null() && cell_text(v).to_lowercase().contains(&needle)))
                    .cloned()
                    .collect()
            },
            None => rows.clone(),
        };
        if let Some(sort) = &query.sort {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(&sort.column), b.get(&sort.column));
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        Ok(rows.into_iter().skip((query.page * limit) as usize).take(limit as usize).collect())
    }

    async fn create(&self, table: &str, values: &Map<String, Value>) -> Result<(), GatewayError> {
        self.take_failure()?;
        let key = self.key_column(table).ok();
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.get_mut(table).ok_or_else(|| GatewayError::Backend(format!("unknown table {table}")))?;

        let mut row = values.clone();
        if let Some(key) = key {
            if !row.contains_key(&key) {
                let next = rows.iter().filter_map(|r| r.get(&key).and_then(Value::as_i64)).max().unwrap_or(0) + 1;
                row.insert(key, Value::from(next));
            }
        }
        rows.push(row);
        Ok(())
    }

    async fn update(&self, table: &str, pk: &Value, values: &Map<String, Value>) -> Result<(), GatewayError> {
        self.update_calls.lock().unwrap().push((pk.clone(), values.clone()));
        self.take_failure()?;
        let key = self.key_column(table)?;
        let mut tables = self.tables.lock().unwrap();
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| r.get(&key) == Some(pk)))
            .ok_or_else(|| GatewayError::Backend(format!("no row {pk} in {table}")))?;
        for (column, value) in values {
            row.insert(column.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, table: &str, pk: &Value) -> Result<(), GatewayError> {
        self.take_failure()?;
        let key = self.key_column(table)?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.get_mut(table).ok_or_else(|| GatewayError::Backend(format!("unknown table {table}")))?;
        let before = rows.len();
        rows.retain(|r| r.get(&key) != Some(pk));
        if rows.len() == before {
            return Err(GatewayError::Backend(format!("no row {pk} in {table}")));
        }
        Ok(())
    }
}
