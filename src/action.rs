use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
  engine::{FetchOutcome, FetchRequest, MutationOutcome, MutationRequest, TableSchema},
  error::GatewayError,
  mode::Mode,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display, Deserialize)]
pub enum Action {
  Tick,
  Render,
  Resize(u16, u16),
  Suspend,
  Resume,
  Quit,
  Refresh,
  Error(String),
  Help,
  EnterMode(Mode),

  // Table list
  LoadSchemas,
  SchemasLoaded(Result<Vec<TableSchema>, GatewayError>),
  TableMoveUp,
  TableMoveDown,
  OpenSelectedTable,
  OpenTable(String),

  // Grid navigation and query state
  RowMoveUp,
  RowMoveDown,
  ColumnLeft,
  ColumnRight,
  ToggleSort,
  StartFilter,
  NextPage,
  PrevPage,
  ToggleRowSelection,
  ToggleAllRows,

  // Row actions
  CreateRow,
  EditRow,
  DeleteRow,
  InspectRow,
  CopyRow,
  ColumnsMenu,

  // Backend round trips
  FetchRows(FetchRequest),
  RowsLoaded(FetchOutcome),
  Mutate(MutationRequest),
  MutationCompleted(MutationOutcome),
}
