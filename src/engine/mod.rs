//! The schema-driven grid engine. Nothing in here touches the terminal or the network.

pub mod columns;
pub mod dialog;
pub mod orchestrator;
pub mod query;
pub mod schema;

/// One row as the backend returns it, in column order.
pub type RecordRow = serde_json::Map<String, serde_json::Value>;

pub use columns::{Align, CellText, ColumnDefinition, DisplayRenderer, EditInput, HeaderView};
pub use dialog::{DeleteState, DialogMode, DialogState, EditBuffer, EditValue};
pub use orchestrator::{
  FetchOutcome, FetchRequest, GridColumn, GridOrchestrator, MutationKind, MutationOp, MutationOutcome,
  MutationRequest, Notice, RowAction,
};
pub use query::{QueryState, QueryStateController, SortDirection, SortSpec};
pub use schema::{ColumnSchema, ColumnType, DeclaredType, SchemaRegistry, TableSchema};
