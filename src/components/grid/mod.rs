pub mod handlers;
pub mod helpers;
pub mod rendering;
pub mod state;

use std::time::Instant;

use chrono::{DateTime, Local};
use color_eyre::eyre::Result;
use ratatui::prelude::*;
use tokio::sync::mpsc::UnboundedSender;

use super::{Component, Frame};
use crate::{
  action::Action,
  config::Config,
  engine::{GridOrchestrator, Notice, SchemaRegistry},
  mode::Mode,
};

/// The table browser: table list on the left, the schema-driven grid on the right, dialogs on top.
pub struct Grid {
  pub command_tx: Option<UnboundedSender<Action>>,
  pub config: Config,
  pub mode: Mode,
  pub orchestrator: GridOrchestrator,

  // Tables and navigation
  pub tables: Vec<String>,
  pub selected_table_index: usize,
  pub pending_table: Option<String>,
  pub schema_error: Option<String>,

  // Grid cursor
  pub selected_row_index: usize,
  pub selected_column_index: usize,
  pub horizontal_scroll_offset: usize,

  // Filter input
  pub filter_input: String,

  // Dialog form
  pub dialog_focus: usize,

  // Popups
  pub columns_menu_index: usize,
  pub inspect_scroll: u16,
  pub show_help: bool,

  // Status line
  pub flash: Option<(Notice, Instant)>,
  pub last_refreshed: Option<DateTime<Local>>,
}

impl Default for Grid {
  fn default() -> Self {
    Self::new(Config::default())
  }
}

impl Grid {
  pub fn new(config: Config) -> Self {
    let page_size = config.grid.page_size;
    Self {
      command_tx: None,
      config,
      mode: Mode::Browse,
      orchestrator: GridOrchestrator::new(SchemaRegistry::default(), page_size),
      tables: vec![],
      selected_table_index: 0,
      pending_table: None,
      schema_error: None,
      selected_row_index: 0,
      selected_column_index: 0,
      horizontal_scroll_offset: 0,
      filter_input: String::new(),
      dialog_focus: 0,
      columns_menu_index: 0,
      inspect_scroll: 0,
      show_help: false,
      flash: None,
      last_refreshed: None,
    }
  }

  /// Opens `table` as soon as the schemas arrive.
  pub fn with_initial_table(mut self, table: Option<String>) -> Self {
    self.pending_table = table;
    self
  }
}

impl Component for Grid {
  fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
    self.command_tx = Some(tx);
    Ok(())
  }

  fn register_config_handler(&mut self, config: Config) -> Result<()> {
    self.register_config_handler(config)
  }

  fn init(&mut self, _area: Rect) -> Result<()> {
    Ok(())
  }

  fn handle_events(&mut self, event: Option<crate::tui::Event>) -> Result<Option<Action>> {
    self.handle_events(event)
  }

  fn handle_key_events(&mut self, key: crossterm::event::KeyEvent) -> Result<Option<Action>> {
    self.handle_key_events(key)
  }

  fn update(&mut self, action: Action) -> Result<Option<Action>> {
    self.update(action)
  }

  fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
    self.draw(f, area)
  }
}
