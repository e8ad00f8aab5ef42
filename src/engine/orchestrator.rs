use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;
use tracing::{debug, error, warn};

use super::{
  columns::{derive_all, ColumnDefinition},
  dialog::{DeleteState, DialogMode, DialogState, EditBuffer, EditValue},
  query::{QueryState, QueryStateController, SortDirection},
  schema::{SchemaRegistry, TableSchema},
  RecordRow,
};
use crate::error::{GatewayError, GridError};

/// A list call the runner should make. `epoch` identifies it when the rows come back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
  pub epoch: u64,
  pub query: QueryState,
  pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
  pub epoch: u64,
  pub table_name: String,
  pub result: Result<Vec<RecordRow>, GatewayError>,
}

impl FetchOutcome {
  pub fn new(request: &FetchRequest, result: Result<Vec<RecordRow>, GatewayError>) -> Self {
    Self { epoch: request.epoch, table_name: request.query.table_name.clone(), result }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum MutationOp {
  Create,
  Update,
  Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
  Create { values: Map<String, Value> },
  Update { pk: Value, values: Map<String, Value> },
  Delete { pk: Value },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRequest {
  pub table_name: String,
  pub kind: MutationKind,
}

impl MutationRequest {
  pub fn op(&self) -> MutationOp {
    match self.kind {
      MutationKind::Create { .. } => MutationOp::Create,
      MutationKind::Update { .. } => MutationOp::Update,
      MutationKind::Delete { .. } => MutationOp::Delete,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
  pub table_name: String,
  pub op: MutationOp,
  pub result: Result<(), GatewayError>,
}

impl MutationOutcome {
  pub fn new(request: &MutationRequest, result: Result<(), GatewayError>) -> Self {
    Self { table_name: request.table_name.clone(), op: request.op(), result }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RowAction {
  Inspect,
  Edit,
  Delete,
}

/// A column as laid out in the grid: the selection box, a data column, then the row actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridColumn<'a> {
  Selection,
  Data(&'a ColumnDefinition),
  Actions,
}

/// A one-line message for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub text: String,
  pub is_error: bool,
}

impl Notice {
  pub fn info(text: impl Into<String>) -> Self {
    Self { text: text.into(), is_error: false }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self { text: text.into(), is_error: true }
  }
}

/// Drives one table view: builds its columns, stamps fetches, guards against stale rows and runs the
/// create/edit/delete flows.
///
/// The orchestrator never performs IO. Each operation that needs the backend returns a request the caller
/// hands to the gateway; the result comes back through [`GridOrchestrator::apply_rows`] or
/// [`GridOrchestrator::apply_mutation`].
#[derive(Debug)]
pub struct GridOrchestrator {
  registry: SchemaRegistry,
  column_cache: HashMap<String, Arc<[ColumnDefinition]>>,
  schema: Option<Arc<TableSchema>>,
  columns: Arc<[ColumnDefinition]>,
  hidden: HashSet<String>,
  query: QueryStateController,
  rows: Vec<RecordRow>,
  page_size: u32,
  epoch: u64,
  loading: bool,
  load_error: Option<GatewayError>,
  fatal: Option<GridError>,
  dialog: DialogState,
  delete: DeleteState,
  notice: Option<Notice>,
}

impl GridOrchestrator {
  pub fn new(registry: SchemaRegistry, page_size: u32) -> Self {
    Self {
      registry,
      column_cache: HashMap::new(),
      schema: None,
      columns: Arc::from(Vec::new()),
      hidden: HashSet::new(),
      query: QueryStateController::default(),
      rows: Vec::new(),
      page_size: page_size.max(1),
      epoch: 0,
      loading: false,
      load_error: None,
      fatal: None,
      dialog: DialogState::Closed,
      delete: DeleteState::Idle,
      notice: None,
    }
  }

  /// Replaces the known schemas. Column definitions built from the old ones are dropped.
  pub fn load_schemas(&mut self, registry: SchemaRegistry) {
    self.registry = registry;
    self.column_cache.clear();
  }

  /// Takes effect from the next fetch.
  pub fn set_page_size(&mut self, page_size: u32) {
    self.page_size = page_size.max(1);
  }

  pub fn registry(&self) -> &SchemaRegistry {
    &self.registry
  }

  fn columns_for(&mut self, schema: &TableSchema) -> Result<Arc<[ColumnDefinition]>, GridError> {
    if let Some(columns) = self.column_cache.get(&schema.name) {
      return Ok(columns.clone());
    }
    let columns: Arc<[ColumnDefinition]> = derive_all(schema)?.into();
    self.column_cache.insert(schema.name.clone(), columns.clone());
    Ok(columns)
  }

  /// Switches the view to `table_name` and returns the first fetch for it.
  ///
  /// Any fetch still in flight for the previous view becomes stale.
  pub fn open_table(&mut self, table_name: &str) -> Result<FetchRequest, GridError> {
    self.epoch += 1;
    self.query.reset(table_name);
    self.rows.clear();
    self.hidden.clear();
    self.loading = false;
    self.load_error = None;
    self.fatal = None;
    self.notice = None;
    self.dialog = DialogState::Closed;
    self.delete = DeleteState::Idle;
    self.columns = Arc::from(Vec::new());
    self.schema = None;

    let built = self.registry.get(table_name).and_then(|schema| {
      self.schema = Some(schema.clone());
      self.columns_for(&schema)
    });
    match built {
      Ok(columns) => {
        self.columns = columns;
        Ok(self.issue_fetch())
      },
      Err(err) => {
        error!(table = table_name, %err, "cannot build grid");
        self.fatal = Some(err.clone());
        Err(err)
      },
    }
  }

  fn issue_fetch(&mut self) -> FetchRequest {
    self.epoch += 1;
    self.loading = true;
    let request = FetchRequest { epoch: self.epoch, query: self.query.state().clone(), limit: self.page_size };
    debug!(epoch = request.epoch, query = ?request.query, "fetch issued");
    request
  }

  fn is_ready(&self) -> bool {
    self.schema.is_some() && self.fatal.is_none()
  }

  fn fetch_if(&mut self, changed: Option<QueryState>) -> Option<FetchRequest> {
    changed.map(|_| self.issue_fetch())
  }

  /// Fetches the current query again.
  pub fn refresh(&mut self) -> Option<FetchRequest> {
    if !self.is_ready() {
      return None;
    }
    Some(self.issue_fetch())
  }

  pub fn set_filter(&mut self, text: &str) -> Option<FetchRequest> {
    if !self.is_ready() {
      return None;
    }
    let changed = self.query.set_filter(text);
    self.fetch_if(changed)
  }

  pub fn set_sort(&mut self, column: &str, direction: Option<SortDirection>) -> Option<FetchRequest> {
    if !self.is_ready() || !self.columns.iter().any(|c| c.id == column && c.sortable) {
      return None;
    }
    let changed = self.query.set_sort(column, direction);
    self.fetch_if(changed)
  }

  /// Advances the sort of `column` one step along none, ascending, descending.
  pub fn toggle_sort(&mut self, column: &str) -> Option<FetchRequest> {
    let next = self.columns.iter().find(|c| c.id == column)?.next_sort(self.query.state());
    self.set_sort(column, next)
  }

  pub fn set_page(&mut self, page: u32) -> Option<FetchRequest> {
    if !self.is_ready() {
      return None;
    }
    let changed = self.query.set_page(page);
    self.fetch_if(changed)
  }

  pub fn next_page(&mut self) -> Option<FetchRequest> {
    if !self.has_next_page() {
      return None;
    }
    self.set_page(self.query.state().page + 1)
  }

  pub fn prev_page(&mut self) -> Option<FetchRequest> {
    let page = self.query.state().page.checked_sub(1)?;
    self.set_page(page)
  }

  /// Applies fetched rows if they answer the latest fetch for the current table. Returns whether they did.
  ///
  /// A failed fetch keeps the rows already on screen.
  pub fn apply_rows(&mut self, outcome: FetchOutcome) -> bool {
    if outcome.epoch != self.epoch || outcome.table_name != self.query.state().table_name {
      debug!(
        epoch = outcome.epoch,
        current = self.epoch,
        table = %outcome.table_name,
        "discarding stale rows"
      );
      return false;
    }

    self.loading = false;
    match outcome.result {
      Ok(rows) => {
        debug!(epoch = outcome.epoch, rows = rows.len(), "rows applied");
        self.rows = rows;
        self.load_error = None;
        self.query.clear_selection();
      },
      Err(err) => {
        warn!(table = %outcome.table_name, %err, "fetch failed, keeping previous rows");
        self.load_error = Some(err);
      },
    }
    true
  }

  /// Only offered when the last fetch filled a whole page.
  pub fn has_next_page(&self) -> bool {
    self.rows.len() >= self.page_size as usize
  }

  pub fn current_table(&self) -> Option<&str> {
    self.schema.as_ref().map(|s| s.name.as_str())
  }

  pub fn schema(&self) -> Option<&TableSchema> {
    self.schema.as_deref()
  }

  pub fn query(&self) -> &QueryState {
    self.query.state()
  }

  pub fn epoch(&self) -> u64 {
    self.epoch
  }

  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  pub fn rows(&self) -> &[RecordRow] {
    &self.rows
  }

  pub fn row(&self, index: usize) -> Option<&RecordRow> {
    self.rows.get(index)
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn load_error(&self) -> Option<&GatewayError> {
    self.load_error.as_ref()
  }

  pub fn fatal_error(&self) -> Option<&GridError> {
    self.fatal.as_ref()
  }

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref()
  }

  pub fn dismiss_notice(&mut self) {
    self.notice = None;
  }

  pub fn has_primary_key(&self) -> bool {
    self.schema.as_ref().is_some_and(|s| s.has_primary_key())
  }

  pub fn row_actions(&self) -> Vec<RowAction> {
    if self.has_primary_key() {
      vec![RowAction::Inspect, RowAction::Edit, RowAction::Delete]
    } else {
      vec![RowAction::Inspect]
    }
  }

  pub fn columns(&self) -> &[ColumnDefinition] {
    &self.columns
  }

  pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
    self.columns.iter().filter(|c| !self.hidden.contains(&c.id))
  }

  pub fn grid_columns(&self) -> Vec<GridColumn<'_>> {
    std::iter::once(GridColumn::Selection)
      .chain(self.visible_columns().map(GridColumn::Data))
      .chain(std::iter::once(GridColumn::Actions))
      .collect()
  }

  pub fn is_hidden(&self, column: &str) -> bool {
    self.hidden.contains(column)
  }

  /// Hides or shows a data column. Returns false for unknown or non-hideable columns.
  pub fn toggle_column(&mut self, column: &str) -> bool {
    if !self.columns.iter().any(|c| c.id == column && c.hideable) {
      return false;
    }
    if !self.hidden.remove(column) {
      self.hidden.insert(column.to_string());
    }
    true
  }

  pub fn is_selected(&self, row: usize) -> bool {
    self.query.is_selected(row)
  }

  pub fn selected_count(&self) -> usize {
    self.query.selection().len()
  }

  pub fn toggle_row_selection(&mut self, row: usize) {
    if row < self.rows.len() {
      self.query.toggle_row(row);
    }
  }

  pub fn toggle_all_selection(&mut self) {
    self.query.toggle_all(self.rows.len());
  }

  fn keyed_row(&self, index: usize) -> Result<Option<(Value, &RecordRow)>, GridError> {
    let schema = self.schema.as_ref().ok_or_else(|| GridError::SchemaNotFound(String::new()))?;
    if !schema.has_primary_key() {
      return Err(GridError::NoPrimaryKey(schema.name.clone()));
    }
    let Some(row) = self.rows.get(index) else {
      return Ok(None);
    };
    let pk = schema.primary_key_value(row).cloned().ok_or_else(|| GridError::NoPrimaryKey(schema.name.clone()))?;
    Ok(Some((pk, row)))
  }

  pub fn dialog(&self) -> &DialogState {
    &self.dialog
  }

  /// Opens an empty create dialog. Fields are only sent once the user touches them.
  pub fn open_create(&mut self) -> bool {
    if !self.is_ready() || !self.dialog.is_closed() {
      return false;
    }
    self.dialog = DialogState::open(DialogMode::Create, EditBuffer::new());
    true
  }

  /// Opens an edit dialog seeded with every column of the row at `index`. Only changed fields are submitted.
  pub fn open_edit(&mut self, index: usize) -> Result<bool, GridError> {
    if !self.is_ready() || !self.dialog.is_closed() {
      return Ok(false);
    }
    let Some((pk, row)) = self.keyed_row(index)? else {
      return Ok(false);
    };
    let buffer = EditBuffer::seeded(
      self.columns.iter().map(|column| (column.id.clone(), column.input.seed(row.get(&column.id)))),
    );
    self.dialog = DialogState::open(DialogMode::Edit { pk }, buffer);
    Ok(true)
  }

  fn primary_key_column(&self) -> Option<&str> {
    self.schema.as_ref()?.primary_key().map(|c| c.name.as_str())
  }

  /// Stores a pending value. The primary key can't be changed while editing.
  pub fn edit_field(&mut self, column: &str, value: EditValue) -> bool {
    let locked = self.primary_key_column().map(str::to_string);
    let DialogState::Open { mode, buffer, field_errors, .. } = &mut self.dialog else {
      return false;
    };
    if matches!(mode, DialogMode::Edit { .. }) && locked.as_deref() == Some(column) {
      return false;
    }
    if !self.columns.iter().any(|c| c.id == column) {
      return false;
    }
    buffer.set(column, value);
    field_errors.remove(column);
    true
  }

  /// Steps a boolean field through unset, true, false.
  pub fn cycle_flag(&mut self, column: &str) -> bool {
    let current = match self.dialog.buffer().and_then(|b| b.get(column)) {
      Some(EditValue::Flag(flag)) => *flag,
      Some(EditValue::Text(_)) => return false,
      None => None,
    };
    self.edit_field(column, EditValue::Flag(EditValue::cycle_flag(current)))
  }

  /// Validates the open dialog and, when every field is valid, moves it to submitting.
  pub fn submit(&mut self) -> Option<MutationRequest> {
    let table_name = self.current_table()?.to_string();
    let locked = self.primary_key_column().map(str::to_string);
    let DialogState::Open { mode, buffer, pending_error, field_errors } = &mut self.dialog else {
      return None;
    };

    let skip = match mode {
      DialogMode::Create => None,
      DialogMode::Edit { .. } => locked.as_deref(),
    };
    let values = match buffer.validate(&self.columns, skip) {
      Ok(values) => values,
      Err(errors) => {
        debug!(fields = errors.len(), "dialog has invalid fields");
        *field_errors = errors;
        *pending_error = None;
        return None;
      },
    };

    let kind = match mode {
      DialogMode::Create => MutationKind::Create { values },
      DialogMode::Edit { pk } => MutationKind::Update { pk: pk.clone(), values },
    };
    let mode = mode.clone();
    let buffer = std::mem::take(buffer);
    self.dialog = DialogState::Submitting { mode, buffer };
    Some(MutationRequest { table_name, kind })
  }

  /// Closes an open dialog. A dialog that is already submitting stays until its outcome arrives.
  pub fn cancel_dialog(&mut self) -> bool {
    if matches!(self.dialog, DialogState::Open { .. }) {
      self.dialog = DialogState::Closed;
      true
    } else {
      false
    }
  }

  pub fn delete_state(&self) -> &DeleteState {
    &self.delete
  }

  /// Asks for confirmation before deleting the row at `index`.
  pub fn request_delete(&mut self, index: usize) -> Result<bool, GridError> {
    if !self.is_ready() || self.delete != DeleteState::Idle {
      return Ok(false);
    }
    let Some((pk, _)) = self.keyed_row(index)? else {
      return Ok(false);
    };
    let key = self.primary_key_column().unwrap_or_default();
    let label = format!("{} where {key} = {pk}", self.current_table().unwrap_or_default());
    self.delete = DeleteState::Confirming { pk, label };
    Ok(true)
  }

  pub fn confirm_delete(&mut self) -> Option<MutationRequest> {
    let table_name = self.current_table()?.to_string();
    let DeleteState::Confirming { pk, .. } = &self.delete else {
      return None;
    };
    let pk = pk.clone();
    self.delete = DeleteState::Deleting { pk: pk.clone() };
    Some(MutationRequest { table_name, kind: MutationKind::Delete { pk } })
  }

  pub fn cancel_delete(&mut self) -> bool {
    if matches!(self.delete, DeleteState::Confirming { .. }) {
      self.delete = DeleteState::Idle;
      true
    } else {
      false
    }
  }

  /// Reconciles a finished create, update or delete. A success yields exactly one refetch.
  pub fn apply_mutation(&mut self, outcome: MutationOutcome) -> Option<FetchRequest> {
    if self.current_table() != Some(outcome.table_name.as_str()) {
      warn!(table = %outcome.table_name, op = %outcome.op, "mutation finished for a table no longer shown");
      return None;
    }

    match outcome.op {
      MutationOp::Create | MutationOp::Update => {
        let DialogState::Submitting { mode, buffer } = std::mem::take(&mut self.dialog) else {
          warn!(op = %outcome.op, "mutation finished without a submitting dialog");
          return None;
        };
        match outcome.result {
          Ok(()) => {
            let verb = if outcome.op == MutationOp::Create { "created" } else { "updated" };
            self.notice = Some(Notice::info(format!("Row {verb} in {}", outcome.table_name)));
            Some(self.issue_fetch())
          },
          Err(err) => {
            warn!(op = %outcome.op, %err, "mutation rejected");
            self.dialog = DialogState::Open {
              mode,
              buffer,
              pending_error: Some(err.message().to_string()),
              field_errors: Default::default(),
            };
            None
          },
        }
      },
      MutationOp::Delete => {
        let DeleteState::Deleting { pk } = std::mem::take(&mut self.delete) else {
          warn!("delete finished without a pending delete");
          return None;
        };
        match outcome.result {
          Ok(()) => {
            self.notice = Some(Notice::info(format!("Deleted row {pk} from {}", outcome.table_name)));
            Some(self.issue_fetch())
          },
          Err(err) => {
            warn!(%pk, %err, "delete rejected");
            self.notice = Some(Notice::error(format!("Delete of row {pk} failed: {}", err.message())));
            None
          },
        }
      },
    }
  }
}
