use chrono::Local;
use color_eyre::eyre::Result;
use tracing::{debug, error};

use super::Grid;
use crate::{
  action::Action,
  config::Config,
  engine::{DialogState, SchemaRegistry},
  mode::Mode,
};

impl Grid {
  pub(super) fn register_config_handler(&mut self, config: Config) -> Result<()> {
    self.orchestrator.set_page_size(config.grid.page_size);
    self.config = config;
    Ok(())
  }

  pub(super) fn update(&mut self, action: Action) -> Result<Option<Action>> {
    match action {
      Action::Tick => {
        self.expire_flash();
      },
      Action::EnterMode(mode) => {
        self.mode = mode;
      },
      Action::Help => {
        self.show_help = !self.show_help;
      },
      Action::Error(message) => {
        self.flash_error(message);
      },
      Action::SchemasLoaded(Ok(schemas)) => {
        debug!(tables = schemas.len(), "schemas loaded");
        self.orchestrator.load_schemas(SchemaRegistry::new(schemas));
        self.tables = self.orchestrator.registry().names();
        self.schema_error = None;
        self.selected_table_index = self.selected_table_index.min(self.tables.len().saturating_sub(1));

        if let Some(table) = self.pending_table.take() {
          if let Some(index) = self.tables.iter().position(|t| *t == table) {
            self.selected_table_index = index;
          }
          return Ok(self.open_table(&table));
        }
      },
      Action::SchemasLoaded(Err(err)) => {
        error!(%err, "could not load table schemas");
        self.schema_error = Some(err.message().to_string());
      },
      Action::TableMoveDown => {
        if !self.tables.is_empty() {
          if self.selected_table_index < self.tables.len() - 1 {
            self.selected_table_index += 1;
          } else {
            self.selected_table_index = 0; // Wrap to top
          }
        }
      },
      Action::TableMoveUp => {
        if !self.tables.is_empty() {
          if self.selected_table_index > 0 {
            self.selected_table_index -= 1;
          } else {
            self.selected_table_index = self.tables.len() - 1; // Wrap to bottom
          }
        }
      },
      Action::OpenSelectedTable => {
        if let Some(table) = self.tables.get(self.selected_table_index).cloned() {
          return Ok(self.open_table(&table));
        }
      },
      Action::OpenTable(table) => {
        return Ok(self.open_table(&table));
      },
      Action::RowMoveDown => {
        let rows = self.orchestrator.rows().len();
        if rows > 0 {
          self.selected_row_index = if self.selected_row_index + 1 < rows { self.selected_row_index + 1 } else { 0 };
        }
      },
      Action::RowMoveUp => {
        let rows = self.orchestrator.rows().len();
        if rows > 0 {
          self.selected_row_index = self.selected_row_index.checked_sub(1).unwrap_or(rows - 1);
        }
      },
      Action::ColumnRight => {
        let columns = self.orchestrator.visible_columns().count();
        if self.selected_column_index + 1 < columns {
          self.selected_column_index += 1;
        }
      },
      Action::ColumnLeft => {
        self.selected_column_index = self.selected_column_index.saturating_sub(1);
      },
      Action::ToggleSort => {
        if let Some(column) = self.focused_column_id() {
          return Ok(self.orchestrator.toggle_sort(&column).map(Action::FetchRows));
        }
      },
      Action::StartFilter => {
        if self.orchestrator.current_table().is_some() {
          self.filter_input = self.orchestrator.query().filter_text.clone().unwrap_or_default();
          return Ok(Some(self.enter_mode(Mode::Filter)));
        }
      },
      Action::NextPage => {
        return Ok(self.orchestrator.next_page().map(Action::FetchRows));
      },
      Action::PrevPage => {
        return Ok(self.orchestrator.prev_page().map(Action::FetchRows));
      },
      Action::Refresh => {
        return Ok(self.orchestrator.refresh().map(Action::FetchRows));
      },
      Action::ToggleRowSelection => {
        self.orchestrator.toggle_row_selection(self.selected_row_index);
      },
      Action::ToggleAllRows => {
        self.orchestrator.toggle_all_selection();
      },
      Action::CreateRow => {
        if self.orchestrator.open_create() {
          self.dialog_focus = 0;
          return Ok(Some(self.enter_mode(Mode::Dialog)));
        }
      },
      Action::EditRow => match self.orchestrator.open_edit(self.selected_row_index) {
        Ok(true) => {
          self.dialog_focus = self.first_editable_field();
          return Ok(Some(self.enter_mode(Mode::Dialog)));
        },
        Ok(false) => {},
        Err(err) => self.flash_error(err.to_string()),
      },
      Action::DeleteRow => match self.orchestrator.request_delete(self.selected_row_index) {
        Ok(true) => return Ok(Some(self.enter_mode(Mode::Confirm))),
        Ok(false) => {},
        Err(err) => self.flash_error(err.to_string()),
      },
      Action::InspectRow => {
        if self.orchestrator.row(self.selected_row_index).is_some() {
          self.inspect_scroll = 0;
          return Ok(Some(self.enter_mode(Mode::Inspect)));
        }
      },
      Action::CopyRow => {
        self.copy_row_as_json();
      },
      Action::ColumnsMenu => {
        if !self.orchestrator.columns().is_empty() {
          self.columns_menu_index = 0;
          return Ok(Some(self.enter_mode(Mode::Columns)));
        }
      },
      Action::RowsLoaded(outcome) => {
        if self.orchestrator.apply_rows(outcome) {
          self.last_refreshed = Some(Local::now());
          let rows = self.orchestrator.rows().len();
          self.selected_row_index = self.selected_row_index.min(rows.saturating_sub(1));
        }
      },
      Action::MutationCompleted(outcome) => {
        let refetch = self.orchestrator.apply_mutation(outcome);
        if self.mode == Mode::Dialog && self.orchestrator.dialog() == &DialogState::Closed {
          let action = self.enter_mode(Mode::Browse);
          self.send(action);
        }
        return Ok(refetch.map(Action::FetchRows));
      },
      _ => {},
    }
    Ok(None)
  }

  /// Switches the grid to `table` and returns the fetch for its first page.
  pub(super) fn open_table(&mut self, table: &str) -> Option<Action> {
    self.selected_row_index = 0;
    self.selected_column_index = 0;
    self.horizontal_scroll_offset = 0;
    self.filter_input.clear();
    self.last_refreshed = None;
    if self.mode != Mode::Browse {
      let action = self.enter_mode(Mode::Browse);
      self.send(action);
    }
    match self.orchestrator.open_table(table) {
      Ok(request) => Some(Action::FetchRows(request)),
      Err(err) => {
        self.flash_error(err.to_string());
        None
      },
    }
  }
}
