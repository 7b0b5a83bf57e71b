use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{DataStore, Direction, Filter, Query, Table};
use crate::error::{StoreError, StoreResult};

/// In-process tables with the same filter and ordering rules as the remote store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    failing: HashSet<Table>,
    read_only: HashSet<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: Table, rows: Vec<Value>) -> Self {
        self.tables.get_mut().entry(table).or_default().extend(rows);
        self
    }

    /// Loads a `{"table_name": [rows...]}` fixture.
    pub fn from_seed_file(path: &Path) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_seed(serde_json::from_str(&raw)?)
    }

    pub fn from_seed(seed: Value) -> StoreResult<Self> {
        let Value::Object(tables) = seed else {
            return Err(StoreError::InvalidQuery("seed must be a JSON object".to_string()));
        };

        let mut store = Self::new();
        for (name, rows) in tables {
            let table = Table::from_name(&name)
                .ok_or_else(|| StoreError::InvalidQuery(format!("unknown table '{}'", name)))?;
            let Value::Array(rows) = rows else {
                return Err(StoreError::InvalidQuery(format!("rows for '{}' must be an array", name)));
            };
            store = store.with_rows(table, rows);
        }
        Ok(store)
    }

    /// Every call touching `table` fails, to exercise error paths.
    #[cfg(test)]
    pub fn failing_on(mut self, table: Table) -> Self {
        self.failing.insert(table);
        self
    }

    /// Reads of `table` succeed but writes fail.
    #[cfg(test)]
    pub fn read_only(mut self, table: Table) -> Self {
        self.read_only.insert(table);
        self
    }

    pub async fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.read().await.get(&table).cloned().unwrap_or_default()
    }

    fn check(&self, table: Table) -> StoreResult<()> {
        if self.failing.contains(&table) {
            return Err(StoreError::Remote {
                status: 503,
                body: format!("{} is unavailable", table),
            });
        }
        Ok(())
    }

    fn check_write(&self, table: Table) -> StoreResult<()> {
        self.check(table)?;
        if self.read_only.contains(&table) {
            return Err(StoreError::Remote {
                status: 403,
                body: format!("{} is read-only", table),
            });
        }
        Ok(())
    }
}

/// Text form of a cell, as a text-cast comparison would see it. SQL NULL never matches.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let cell = row.get(filter.column()).and_then(cell_text);
        match (filter, cell) {
            (Filter::Eq(_, expected), Some(actual)) => &actual == expected,
            (Filter::In(_, set), Some(actual)) => set.contains(&actual),
            (_, None) => false,
        }
    })
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (a, b) => cell_text_opt(a).cmp(&cell_text_opt(b)),
    }
}

fn cell_text_opt(value: Option<&Value>) -> Option<String> {
    value.and_then(cell_text)
}

fn is_null(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn project(row: &Value, columns: &[String]) -> Value {
    if columns.is_empty() {
        return row.clone();
    }
    let mut out = Map::new();
    for column in columns {
        out.insert(column.clone(), row.get(column).cloned().unwrap_or(Value::Null));
    }
    Value::Object(out)
}

fn merge(target: &mut Value, values: &Value) {
    if let (Value::Object(target), Value::Object(values)) = (target, values) {
        for (key, value) in values {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>> {
        self.check(query.table)?;
        let tables = self.tables.read().await;
        let mut rows: Vec<&Value> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| matches(row, &query.filters)).collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            // Postgres default: NULLS LAST ascending, NULLS FIRST descending.
            rows.sort_by(|a, b| {
                let (a, b) = (a.get(&order.column), b.get(&order.column));
                match (is_null(a), is_null(b)) {
                    (true, true) => Ordering::Equal,
                    (true, false) => match order.direction {
                        Direction::Asc => Ordering::Greater,
                        Direction::Desc => Ordering::Less,
                    },
                    (false, true) => match order.direction {
                        Direction::Asc => Ordering::Less,
                        Direction::Desc => Ordering::Greater,
                    },
                    (false, false) => match order.direction {
                        Direction::Asc => compare_cells(a, b),
                        Direction::Desc => compare_cells(b, a),
                    },
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|row| project(row, &query.columns))
            .collect())
    }

    async fn count(&self, query: &Query) -> StoreResult<u64> {
        self.check(query.table)?;
        let tables = self.tables.read().await;
        let count = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| matches(row, &query.filters)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn update(&self, table: Table, values: Value, filters: &[Filter]) -> StoreResult<u64> {
        self.check_write(table)?;
        let mut tables = self.tables.write().await;
        let mut touched = 0;
        for row in tables.entry(table).or_default().iter_mut() {
            if matches(row, filters) {
                merge(row, &values);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn upsert(&self, table: Table, rows: Vec<Value>, on_conflict: &str) -> StoreResult<()> {
        self.check_write(table)?;
        let mut tables = self.tables.write().await;
        let existing = tables.entry(table).or_default();
        for row in rows {
            let key = row.get(on_conflict).and_then(cell_text);
            let slot = key.as_ref().and_then(|key| {
                existing
                    .iter_mut()
                    .find(|r| r.get(on_conflict).and_then(cell_text).as_ref() == Some(key))
            });
            match slot {
                Some(current) => merge(current, &row),
                None => existing.push(row),
            }
        }
        Ok(())
    }
}
