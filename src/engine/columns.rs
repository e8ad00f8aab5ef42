use serde_json::{Number, Value};

use super::{
  dialog::EditValue,
  query::{QueryState, SortDirection},
  schema::{ColumnSchema, ColumnType, DeclaredType, TableSchema},
};
use crate::error::GridError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
  Left,
  Right,
  Center,
}

/// A cell value ready to be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellText {
  pub text: String,
  pub align: Align,
  pub is_null: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRenderer {
  /// The value as the backend sent it.
  Raw { align: Align },
  /// Read-only checkbox with a third state for null.
  TriState,
}

impl DisplayRenderer {
  pub fn render(&self, value: Option<&Value>) -> CellText {
    let value = value.unwrap_or(&Value::Null);
    match self {
      DisplayRenderer::Raw { align } => match value {
        Value::Null => CellText { text: "NULL".to_string(), align: *align, is_null: true },
        Value::String(s) => CellText { text: s.clone(), align: *align, is_null: false },
        other => CellText { text: other.to_string(), align: *align, is_null: false },
      },
      DisplayRenderer::TriState => {
        let text = match value {
          Value::Bool(true) => "[x]",
          Value::Bool(false) => "[ ]",
          _ => "[-]",
        };
        CellText { text: text.to_string(), align: Align::Center, is_null: value.is_null() }
      },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditInput {
  /// Free text. With `omit_blank`, an empty field is left out of the submitted values.
  FreeText { omit_blank: bool },
  Integer,
  Float,
  /// Cycles unset -> true -> false -> unset.
  TriState,
}

impl EditInput {
  /// The initial buffer value for an edit dialog.
  pub fn seed(&self, value: Option<&Value>) -> EditValue {
    let value = value.unwrap_or(&Value::Null);
    match self {
      EditInput::TriState => EditValue::Flag(value.as_bool()),
      _ => match value {
        Value::Null => EditValue::Text(String::new()),
        Value::String(s) => EditValue::Text(s.clone()),
        other => EditValue::Text(other.to_string()),
      },
    }
  }

  /// The empty value a create dialog starts a field with.
  pub fn blank(&self) -> EditValue {
    match self {
      EditInput::TriState => EditValue::Flag(None),
      _ => EditValue::Text(String::new()),
    }
  }

  /// Converts pending input into the JSON value sent to the backend.
  ///
  /// `Ok(None)` means the field is left out of the request.
  pub fn coerce(&self, column: &str, value: &EditValue) -> Result<Option<Value>, GridError> {
    match (self, value) {
      (EditInput::FreeText { omit_blank }, EditValue::Text(text)) => {
        if *omit_blank && text.trim().is_empty() {
          Ok(None)
        } else {
          Ok(Some(Value::String(text.clone())))
        }
      },
      (EditInput::Integer, EditValue::Text(text)) => {
        let text = text.trim();
        if text.is_empty() {
          return Ok(None);
        }
        text
          .parse::<i64>()
          .map(|n| Some(Value::from(n)))
          .map_err(|_| GridError::validation(column, format!("'{text}' is not an integer")))
      },
      (EditInput::Float, EditValue::Text(text)) => {
        let text = text.trim();
        if text.is_empty() {
          return Ok(None);
        }
        text
          .parse::<f64>()
          .ok()
          .and_then(Number::from_f64)
          .map(|n| Some(Value::Number(n)))
          .ok_or_else(|| GridError::validation(column, format!("'{text}' is not a number")))
      },
      (EditInput::TriState, EditValue::Flag(flag)) => Ok(Some(flag.map(Value::Bool).unwrap_or(Value::Null))),
      (_, other) => Err(GridError::validation(column, format!("unexpected input {other:?}"))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
  pub label: String,
  pub direction: Option<SortDirection>,
}

impl HeaderView {
  pub fn text(&self) -> String {
    match self.direction {
      Some(SortDirection::Ascending) => format!("{} ▲", self.label),
      Some(SortDirection::Descending) => format!("{} ▼", self.label),
      None => self.label.clone(),
    }
  }
}

/// Everything the grid needs to show and edit one data column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
  pub id: String,
  pub column_type: ColumnType,
  pub is_primary_key: bool,
  pub label: String,
  pub display: DisplayRenderer,
  pub input: EditInput,
  pub sortable: bool,
  pub hideable: bool,
}

impl ColumnDefinition {
  pub fn header_view(&self, query: &QueryState) -> HeaderView {
    HeaderView { label: self.label.clone(), direction: query.sort_direction_of(&self.id) }
  }

  /// The direction the next header activation asks for.
  pub fn next_sort(&self, query: &QueryState) -> Option<SortDirection> {
    SortDirection::cycle(query.sort_direction_of(&self.id))
  }

  pub fn render(&self, value: Option<&Value>) -> CellText {
    self.display.render(value)
  }
}

fn header_label(name: &str, column_type: ColumnType) -> String {
  let mut chars = name.chars();
  let mut label = match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
    None => String::new(),
  };
  if column_type == ColumnType::Boolean {
    label.push('?');
  }
  label
}

/// Builds the definition of one column of `table`.
pub fn derive(table: &str, column: &ColumnSchema) -> Result<ColumnDefinition, GridError> {
  let column_type = match &column.declared_type {
    DeclaredType::Known(column_type) => *column_type,
    DeclaredType::Unsupported(declared) => {
      return Err(GridError::UnsupportedColumnType {
        table: table.to_string(),
        column: column.name.clone(),
        declared: declared.clone(),
      })
    },
  };

  let (display, input) = match column_type {
    ColumnType::String => (DisplayRenderer::Raw { align: Align::Left }, EditInput::FreeText { omit_blank: false }),
    ColumnType::Numeric => (DisplayRenderer::Raw { align: Align::Left }, EditInput::FreeText { omit_blank: true }),
    ColumnType::Integer => (DisplayRenderer::Raw { align: Align::Right }, EditInput::Integer),
    ColumnType::Float => (DisplayRenderer::Raw { align: Align::Right }, EditInput::Float),
    ColumnType::Boolean => (DisplayRenderer::TriState, EditInput::TriState),
  };

  Ok(ColumnDefinition {
    id: column.name.clone(),
    column_type,
    is_primary_key: column.is_primary_key,
    label: header_label(&column.name, column_type),
    display,
    input,
    sortable: true,
    hideable: true,
  })
}

/// Builds every column of a table in schema order. The first unsupported column aborts the whole table.
pub fn derive_all(schema: &TableSchema) -> Result<Vec<ColumnDefinition>, GridError> {
  schema.columns.iter().map(|column| derive(&schema.name, column)).collect()
}
