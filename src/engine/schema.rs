use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};
use tracing::warn;

use super::RecordRow;
use crate::error::GridError;

/// The column types the grid knows how to display and edit.
///
/// Backends built on Postgres report raw `information_schema` names, so the common ones parse too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum ColumnType {
  #[strum(to_string = "String", serialize = "text", serialize = "varchar", serialize = "character varying")]
  String,
  #[strum(to_string = "Integer", serialize = "int", serialize = "bigint", serialize = "smallint")]
  Integer,
  #[strum(to_string = "Float", serialize = "real", serialize = "double precision")]
  Float,
  #[strum(to_string = "Numeric", serialize = "decimal")]
  Numeric,
  #[strum(to_string = "Boolean", serialize = "bool")]
  Boolean,
}

/// A column type as declared by the backend.
///
/// Unknown names are kept instead of rejected so only the table that uses them fails to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeclaredType {
  Known(ColumnType),
  Unsupported(String),
}

impl From<String> for DeclaredType {
  fn from(raw: String) -> Self {
    match ColumnType::from_str(raw.trim()) {
      Ok(column_type) => DeclaredType::Known(column_type),
      Err(_) => DeclaredType::Unsupported(raw),
    }
  }
}

impl From<DeclaredType> for String {
  fn from(declared: DeclaredType) -> Self {
    declared.to_string()
  }
}

impl From<ColumnType> for DeclaredType {
  fn from(column_type: ColumnType) -> Self {
    DeclaredType::Known(column_type)
  }
}

impl fmt::Display for DeclaredType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeclaredType::Known(column_type) => write!(f, "{column_type}"),
      DeclaredType::Unsupported(raw) => f.write_str(raw),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
  pub name: String,
  #[serde(rename = "type")]
  pub declared_type: DeclaredType,
  #[serde(rename = "primary_key", alias = "isPrimaryKey", default)]
  pub is_primary_key: bool,
}

impl ColumnSchema {
  pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
    Self { name: name.into(), declared_type: column_type.into(), is_primary_key: false }
  }

  pub fn primary_key(mut self) -> Self {
    self.is_primary_key = true;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
  pub name: String,
  #[serde(rename = "has_pk_key", alias = "hasPrimaryKey", default)]
  pub declared_primary_key: bool,
  pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
  pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
    let mut schema = Self { name: name.into(), declared_primary_key: false, columns };
    schema.declared_primary_key = schema.has_primary_key();
    schema
  }

  /// The single primary-key column. Composite keys don't identify a row by one value, so they count as none.
  pub fn primary_key(&self) -> Option<&ColumnSchema> {
    let mut keys = self.columns.iter().filter(|c| c.is_primary_key);
    match (keys.next(), keys.next()) {
      (Some(column), None) => Some(column),
      _ => None,
    }
  }

  pub fn has_primary_key(&self) -> bool {
    self.primary_key().is_some()
  }

  pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn primary_key_value<'a>(&self, row: &'a RecordRow) -> Option<&'a Value> {
    let key = self.primary_key()?;
    row.get(&key.name).filter(|v| !v.is_null())
  }
}

/// Every table schema known to the session, keyed by name. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
  tables: HashMap<String, Arc<TableSchema>>,
}

impl SchemaRegistry {
  pub fn new(schemas: Vec<TableSchema>) -> Self {
    let tables = schemas
      .into_iter()
      .map(|schema| {
        if schema.declared_primary_key != schema.has_primary_key() {
          warn!(
            table = %schema.name,
            declared = schema.declared_primary_key,
            "primary key flag disagrees with column metadata, using column metadata"
          );
        }
        (schema.name.clone(), Arc::new(schema))
      })
      .collect();
    Self { tables }
  }

  pub fn get(&self, table_name: &str) -> Result<Arc<TableSchema>, GridError> {
    self.tables.get(table_name).cloned().ok_or_else(|| GridError::SchemaNotFound(table_name.to_string()))
  }

  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.tables.keys().cloned().collect();
    names.sort();
    names
  }

  pub fn len(&self) -> usize {
    self.tables.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tables.is_empty()
  }
}
