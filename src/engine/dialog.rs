use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::columns::ColumnDefinition;

/// A pending value in an open dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditValue {
  Text(String),
  Flag(Option<bool>),
}

impl EditValue {
  /// unset -> true -> false -> unset
  pub fn cycle_flag(flag: Option<bool>) -> Option<bool> {
    match flag {
      None => Some(true),
      Some(true) => Some(false),
      Some(false) => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      EditValue::Text(text) => Some(text),
      EditValue::Flag(_) => None,
    }
  }
}

/// Column name to pending value, scoped to one open dialog.
///
/// An edit buffer remembers what each field was seeded with; only fields that differ from it are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
  values: BTreeMap<String, EditValue>,
  seeded: BTreeMap<String, EditValue>,
}

pub type FieldErrors = BTreeMap<String, String>;

impl EditBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// A buffer holding a row's current values, as an edit dialog starts.
  pub fn seeded(values: impl IntoIterator<Item = (String, EditValue)>) -> Self {
    let seeded: BTreeMap<_, _> = values.into_iter().collect();
    Self { values: seeded.clone(), seeded }
  }

  /// Whether `column` holds something other than what it was seeded with.
  pub fn is_touched(&self, column: &str) -> bool {
    self.values.get(column) != self.seeded.get(column)
  }

  pub fn get(&self, column: &str) -> Option<&EditValue> {
    self.values.get(column)
  }

  pub fn set(&mut self, column: impl Into<String>, value: EditValue) {
    self.values.insert(column.into(), value);
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  /// Coerces every touched field. `skip` names a column that is not sent (the primary key while editing).
  ///
  /// A seeded field cleared to blank is sent as `null`; a blank field in a fresh buffer is left out.
  /// All failing fields are reported together so the dialog can mark each one.
  pub fn validate(&self, columns: &[ColumnDefinition], skip: Option<&str>) -> Result<Map<String, Value>, FieldErrors> {
    let mut values = Map::new();
    let mut errors = FieldErrors::new();

    for column in columns {
      if Some(column.id.as_str()) == skip {
        continue;
      }
      let Some(pending) = self.values.get(&column.id) else {
        continue;
      };
      if !self.is_touched(&column.id) {
        continue;
      }
      match column.input.coerce(&column.id, pending) {
        Ok(Some(value)) => {
          values.insert(column.id.clone(), value);
        },
        Ok(None) if self.seeded.contains_key(&column.id) => {
          values.insert(column.id.clone(), Value::Null);
        },
        Ok(None) => {},
        Err(err) => {
          errors.insert(column.id.clone(), err.to_string());
        },
      }
    }

    if errors.is_empty() {
      Ok(values)
    } else {
      Err(errors)
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMode {
  Create,
  /// Editing the row identified by `pk`.
  Edit { pk: Value },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogState {
  #[default]
  Closed,
  Open { mode: DialogMode, buffer: EditBuffer, pending_error: Option<String>, field_errors: FieldErrors },
  Submitting { mode: DialogMode, buffer: EditBuffer },
}

impl DialogState {
  pub fn open(mode: DialogMode, buffer: EditBuffer) -> Self {
    DialogState::Open { mode, buffer, pending_error: None, field_errors: FieldErrors::new() }
  }

  pub fn is_closed(&self) -> bool {
    matches!(self, DialogState::Closed)
  }

  pub fn is_submitting(&self) -> bool {
    matches!(self, DialogState::Submitting { .. })
  }

  pub fn mode(&self) -> Option<&DialogMode> {
    match self {
      DialogState::Closed => None,
      DialogState::Open { mode, .. } | DialogState::Submitting { mode, .. } => Some(mode),
    }
  }

  pub fn buffer(&self) -> Option<&EditBuffer> {
    match self {
      DialogState::Closed => None,
      DialogState::Open { buffer, .. } | DialogState::Submitting { buffer, .. } => Some(buffer),
    }
  }

  pub fn pending_error(&self) -> Option<&str> {
    match self {
      DialogState::Open { pending_error, .. } => pending_error.as_deref(),
      _ => None,
    }
  }

  pub fn field_error(&self, column: &str) -> Option<&str> {
    match self {
      DialogState::Open { field_errors, .. } => field_errors.get(column).map(String::as_str),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeleteState {
  #[default]
  Idle,
  Confirming { pk: Value, label: String },
  Deleting { pk: Value },
}
