use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
  engine::{QueryState, RecordRow, SortSpec, TableSchema},
  error::GatewayError,
};

/// The backend operations the grid needs. Every call is async and reports a typed failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
  async fn tables(&self) -> Result<Vec<TableSchema>, GatewayError>;
  async fn list(&self, query: &QueryState, limit: u32) -> Result<Vec<RecordRow>, GatewayError>;
  async fn create(&self, table: &str, values: &Map<String, Value>) -> Result<(), GatewayError>;
  async fn update(&self, table: &str, pk: &Value, values: &Map<String, Value>) -> Result<(), GatewayError>;
  async fn delete(&self, table: &str, pk: &Value) -> Result<(), GatewayError>;
}

#[derive(Debug, Serialize)]
struct RetrieveBody<'a> {
  table: &'a str,
  page: u32,
  limit: u32,
  offset: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  filter: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  sort: Option<&'a SortSpec>,
}

impl<'a> RetrieveBody<'a> {
  fn new(query: &'a QueryState, limit: u32) -> Self {
    Self {
      table: &query.table_name,
      page: query.page,
      limit,
      offset: u64::from(query.page) * u64::from(limit),
      filter: query.filter_text.as_deref(),
      sort: query.sort.as_ref(),
    }
  }
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
  table: &'a str,
  values: &'a Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
  table: &'a str,
  pk: &'a Value,
  values: &'a Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
  table: &'a str,
  pk: &'a Value,
}

/// JSON over HTTP against the generic CRUD backend.
#[derive(Debug, Clone)]
pub struct HttpGateway {
  client: Client,
  base_url: String,
}

impl HttpGateway {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{path}", self.base_url)
  }

  async fn get(&self, path: &str) -> Result<Value, GatewayError> {
    debug!(path, "GET");
    let response = self.client.get(self.url(path)).send().await?;
    read_response(response).await
  }

  async fn post<B: Serialize + Sync + ?Sized>(&self, path: &str, body: &B) -> Result<Value, GatewayError> {
    debug!(path, "POST");
    let response = self.client.post(self.url(path)).json(body).send().await?;
    read_response(response).await
  }
}

async fn read_response(response: reqwest::Response) -> Result<Value, GatewayError> {
  let status = response.status();
  let body = response.bytes().await?;
  decode_body(status, &body)
}

/// Turns a raw reply into JSON, surfacing `{ "error": ... }` bodies and failed statuses as backend errors.
fn decode_body(status: StatusCode, body: &[u8]) -> Result<Value, GatewayError> {
  let value = match serde_json::from_slice::<Value>(body) {
    Ok(value) => value,
    Err(_) if !status.is_success() => return Err(GatewayError::Backend(format!("backend returned {status}"))),
    Err(err) => return Err(GatewayError::Network(format!("invalid response body: {err}"))),
  };

  if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
    let message = match error {
      Value::String(message) => message.clone(),
      other => other.to_string(),
    };
    return Err(GatewayError::Backend(message));
  }

  if !status.is_success() {
    return Err(GatewayError::Backend(format!("backend returned {status}")));
  }

  Ok(value)
}

/// Accepts both `{ "data": [...] }` and a bare array.
fn unwrap_data(value: Value) -> Result<Vec<Value>, GatewayError> {
  let data = match value {
    Value::Object(mut envelope) => envelope.remove("data").unwrap_or(Value::Null),
    other => other,
  };
  match data {
    Value::Array(items) => Ok(items),
    other => Err(GatewayError::Network(format!("invalid response body: expected a list, got {other}"))),
  }
}

fn rows_from(value: Value) -> Result<Vec<RecordRow>, GatewayError> {
  unwrap_data(value)?
    .into_iter()
    .map(|item| match item {
      Value::Object(row) => Ok(row),
      other => Err(GatewayError::Network(format!("invalid response body: row is not an object: {other}"))),
    })
    .collect()
}

fn tables_from(value: Value) -> Result<Vec<TableSchema>, GatewayError> {
  let items = unwrap_data(value)?;
  serde_json::from_value(Value::Array(items))
    .map_err(|err| GatewayError::Network(format!("invalid response body: {err}")))
}

#[async_trait]
impl Gateway for HttpGateway {
  async fn tables(&self) -> Result<Vec<TableSchema>, GatewayError> {
    tables_from(self.get("tables").await?)
  }

  async fn list(&self, query: &QueryState, limit: u32) -> Result<Vec<RecordRow>, GatewayError> {
    rows_from(self.post("retrieve", &RetrieveBody::new(query, limit)).await?)
  }

  async fn create(&self, table: &str, values: &Map<String, Value>) -> Result<(), GatewayError> {
    self.post("create", &CreateBody { table, values }).await.map(|_| ())
  }

  async fn update(&self, table: &str, pk: &Value, values: &Map<String, Value>) -> Result<(), GatewayError> {
    self.post("update", &UpdateBody { table, pk, values }).await.map(|_| ())
  }

  async fn delete(&self, table: &str, pk: &Value) -> Result<(), GatewayError> {
    self.post("delete", &DeleteBody { table, pk }).await.map(|_| ())
  }
}
