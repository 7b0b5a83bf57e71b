use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, query::QueryScalar, PgPool, Postgres};

use super::{validate_identifier, DataStore, Direction, Filter, Query, Table};
use crate::error::{StoreError, StoreResult};

/// Direct connection to the Postgres database behind the hosted API.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;

        // Test the connection
        sqlx::query("SELECT 1").fetch_one(&pool).await?;

        log::info!("Connected to database successfully");
        Ok(Self { pool })
    }
}

/// Bind values collected while building a statement, in placeholder order.
#[derive(Debug, PartialEq)]
pub(crate) enum Bind {
    Text(String),
    TextList(Vec<String>),
    Json(Value),
}

fn quoted(name: &str) -> StoreResult<String> {
    Ok(format!("\"{}\"", validate_identifier(name)?))
}

/// `WHERE` clause over text-cast columns so every filter binds as text.
pub(crate) fn where_clause(
    filters: &[Filter],
    qualifier: Option<&str>,
    binds: &mut Vec<Bind>,
) -> StoreResult<String> {
    let mut conditions = Vec::new();
    for filter in filters {
        let column = match qualifier {
            Some(alias) => format!("{}.{}", alias, quoted(filter.column())?),
            None => quoted(filter.column())?,
        };
        match filter {
            Filter::Eq(_, value) => {
                binds.push(Bind::Text(value.clone()));
                conditions.push(format!("{}::text = ${}", column, binds.len()));
            }
            Filter::In(_, values) => {
                binds.push(Bind::TextList(values.clone()));
                conditions.push(format!("{}::text = ANY(${})", column, binds.len()));
            }
        }
    }

    if conditions.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", conditions.join(" AND ")))
    }
}

pub(crate) fn select_sql(query: &Query) -> StoreResult<(String, Vec<Bind>)> {
    let mut binds = Vec::new();
    let columns = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query
            .columns
            .iter()
            .map(|c| quoted(c))
            .collect::<StoreResult<Vec<_>>>()?
            .join(", ")
    };

    let mut inner = format!(
        "SELECT {} FROM {}{}",
        columns,
        quoted(query.table.as_str())?,
        where_clause(&query.filters, None, &mut binds)?
    );
    if let Some(order) = &query.order {
        let direction = match order.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        inner.push_str(&format!(" ORDER BY {} {}", quoted(&order.column)?, direction));
    }
    if let Some(limit) = query.limit {
        inner.push_str(&format!(" LIMIT {}", limit));
    }

    Ok((format!("SELECT row_to_json(t) FROM ({}) t", inner), binds))
}

fn bind_all<'q, O>(
    mut statement: QueryScalar<'q, Postgres, O, PgArguments>,
    binds: Vec<Bind>,
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for bind in binds {
        statement = match bind {
            Bind::Text(value) => statement.bind(value),
            Bind::TextList(values) => statement.bind(values),
            Bind::Json(value) => statement.bind(value),
        };
    }
    statement
}

#[async_trait]
impl DataStore for PgStore {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>> {
        let (sql, binds) = select_sql(query)?;
        let rows = bind_all(sqlx::query_scalar::<_, Value>(&sql), binds)
            .fetch_all(&self.pool)
            .await?;
        log::debug!("{}: fetched {} rows", query.table, rows.len());
        Ok(rows)
    }

    async fn count(&self, query: &Query) -> StoreResult<u64> {
        let mut binds = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            quoted(query.table.as_str())?,
            where_clause(&query.filters, None, &mut binds)?
        );
        let count = bind_all(sqlx::query_scalar::<_, i64>(&sql), binds)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn update(&self, table: Table, values: Value, filters: &[Filter]) -> StoreResult<u64> {
        let Value::Object(fields) = &values else {
            return Err(StoreError::InvalidQuery("update values must be an object".to_string()));
        };
        let table_name = quoted(table.as_str())?;
        let assignments = fields
            .keys()
            .map(|key| quoted(key).map(|col| format!("{col} = r.{col}")))
            .collect::<StoreResult<Vec<_>>>()?
            .join(", ");

        let mut binds = vec![Bind::Json(values.clone())];
        let conditions = where_clause(filters, Some("target"), &mut binds)?;
        let sql = format!(
            "WITH updated AS (UPDATE {table} AS target SET {assignments} \
             FROM jsonb_populate_record(NULL::{table}, $1) r{conditions} RETURNING 1) \
             SELECT COUNT(*) FROM updated",
            table = table_name,
            assignments = assignments,
            conditions = conditions,
        );
        let touched = bind_all(sqlx::query_scalar::<_, i64>(&sql), binds)
            .fetch_one(&self.pool)
            .await?;
        Ok(touched.max(0) as u64)
    }

    async fn upsert(&self, table: Table, rows: Vec<Value>, on_conflict: &str) -> StoreResult<()> {
        let table_name = quoted(table.as_str())?;
        let conflict = quoted(on_conflict)?;

        for row in rows {
            let Value::Object(fields) = &row else {
                return Err(StoreError::InvalidQuery("upsert rows must be objects".to_string()));
            };
            let columns = fields
                .keys()
                .map(|key| quoted(key))
                .collect::<StoreResult<Vec<_>>>()?;
            let updates = columns
                .iter()
                .filter(|col| **col != conflict)
                .map(|col| format!("{col} = EXCLUDED.{col}"))
                .collect::<Vec<_>>();
            let on_conflict_action = if updates.is_empty() {
                "DO NOTHING".to_string()
            } else {
                format!("DO UPDATE SET {}", updates.join(", "))
            };

            let sql = format!(
                "INSERT INTO {table} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1) \
                 ON CONFLICT ({conflict}) {action}",
                table = table_name,
                cols = columns.join(", "),
                conflict = conflict,
                action = on_conflict_action,
            );
            sqlx::query(&sql).bind(row).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_compiles_to_row_to_json() {
        let query = Query::table(Table::Leads)
            .select("id, user_id, lead_score")
            .is_in("user_id", ["u1", "u2"])
            .eq("status", "new")
            .order("created_at", Direction::Desc)
            .limit(10);

        let (sql, binds) = select_sql(&query).unwrap();
        assert_eq!(
            sql,
            "SELECT row_to_json(t) FROM (SELECT \"id\", \"user_id\", \"lead_score\" FROM \"leads\" \
             WHERE \"user_id\"::text = ANY($1) AND \"status\"::text = $2 \
             ORDER BY \"created_at\" DESC LIMIT 10) t"
        );
        assert_eq!(
            binds,
            vec![
                Bind::TextList(vec!["u1".to_string(), "u2".to_string()]),
                Bind::Text("new".to_string()),
            ]
        );
    }

    #[test]
    fn unfiltered_select_has_no_where() {
        let (sql, binds) = select_sql(&Query::table(Table::ContactForm)).unwrap();
        assert_eq!(sql, "SELECT row_to_json(t) FROM (SELECT * FROM \"contact_form\") t");
        assert!(binds.is_empty());
    }

    #[test]
    fn unsafe_identifiers_are_rejected() {
        let query = Query::table(Table::Users).eq("id\" OR 1=1 --", "x");
        assert!(select_sql(&query).is_err());
    }

    #[test]
    fn qualified_filters_avoid_ambiguous_columns() {
        let mut binds = vec![Bind::Json(Value::Null)];
        let clause = where_clause(&[Filter::Eq("user_id".into(), "u1".into())], Some("target"), &mut binds).unwrap();
        assert_eq!(clause, " WHERE target.\"user_id\"::text = $2");
    }
}
