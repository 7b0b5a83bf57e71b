use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;

use super::{validate_identifier, DataStore, Direction, Filter, Query, Table};
use crate::error::{StoreError, StoreResult};

/// Client for a PostgREST-style endpoint (`<url>/rest/v1/<table>`).
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(url: &str, api_key: &str) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}", self.base_url, table.as_str())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Remote {
            status: status.as_u16(),
            body,
        })
    }
}

fn quote_value(value: &str) -> String {
    // Reserved characters inside in.(...) lists need double quotes.
    if value.contains(&[',', '(', ')', '"', ' ', '.', ':'][..]) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Renders filters as PostgREST query pairs, e.g. `user_id=eq.42`.
pub(crate) fn filter_params(filters: &[Filter]) -> StoreResult<Vec<(String, String)>> {
    filters
        .iter()
        .map(|filter| {
            let column = validate_identifier(filter.column())?.to_string();
            let value = match filter {
                Filter::Eq(_, value) => format!("eq.{}", value),
                Filter::In(_, values) => {
                    let list: Vec<String> = values.iter().map(|v| quote_value(v)).collect();
                    format!("in.({})", list.join(","))
                }
            };
            Ok((column, value))
        })
        .collect()
}

pub(crate) fn query_params(query: &Query) -> StoreResult<Vec<(String, String)>> {
    let select = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query
            .columns
            .iter()
            .map(|c| validate_identifier(c))
            .collect::<StoreResult<Vec<_>>>()?
            .join(",")
    };

    let mut params = vec![("select".to_string(), select)];
    params.extend(filter_params(&query.filters)?);
    if let Some(order) = &query.order {
        let direction = match order.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        params.push((
            "order".to_string(),
            format!("{}.{}", validate_identifier(&order.column)?, direction),
        ));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    Ok(params)
}

/// Total from a `Content-Range: 0-24/3573` (or `*/0`) header.
pub(crate) fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl DataStore for RestStore {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>> {
        let params = query_params(query)?;
        let response = self
            .authorized(self.client.get(self.table_url(query.table)))
            .query(&params)
            .send()
            .await?;
        let rows = Self::check(response).await?.json::<Vec<Value>>().await?;
        log::debug!("{}: fetched {} rows", query.table, rows.len());
        Ok(rows)
    }

    async fn count(&self, query: &Query) -> StoreResult<u64> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(&query.filters)?);
        let response = self
            .authorized(self.client.head(self.table_url(query.table)))
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await?;
        let response = Self::check(response).await?;
        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| StoreError::Remote {
                status: response.status().as_u16(),
                body: "missing Content-Range in count response".to_string(),
            })
    }

    async fn update(&self, table: Table, values: Value, filters: &[Filter]) -> StoreResult<u64> {
        let response = self
            .authorized(self.client.patch(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&filter_params(filters)?)
            .json(&values)
            .send()
            .await?;
        let touched = Self::check(response).await?.json::<Vec<Value>>().await?;
        Ok(touched.len() as u64)
    }

    async fn upsert(&self, table: Table, rows: Vec<Value>, on_conflict: &str) -> StoreResult<()> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", validate_identifier(on_conflict)?)])
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
