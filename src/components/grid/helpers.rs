use std::time::{Duration, Instant};

use ratatui::prelude::*;
use tracing::{debug, warn};

use super::Grid;
use crate::{
  action::Action,
  engine::{ColumnDefinition, DialogMode, EditValue, Notice, RecordRow},
  mode::Mode,
};

const FLASH_TTL: Duration = Duration::from_secs(5);
const MIN_COLUMN_WIDTH: u16 = 4;
const MAX_COLUMN_WIDTH: u16 = 32;

impl Grid {
  pub(super) fn send(&self, action: Action) {
    if let Some(tx) = &self.command_tx {
      if let Err(e) = tx.send(action) {
        debug!("action loop closed: {e}");
      }
    }
  }

  /// Switches the keyboard owner locally and returns the action that tells the app.
  pub(super) fn enter_mode(&mut self, mode: Mode) -> Action {
    self.mode = mode;
    Action::EnterMode(mode)
  }

  pub(super) fn flash_error(&mut self, text: impl Into<String>) {
    self.flash = Some((Notice::error(text), Instant::now()));
  }

  pub(super) fn flash_info(&mut self, text: impl Into<String>) {
    self.flash = Some((Notice::info(text), Instant::now()));
  }

  pub(super) fn expire_flash(&mut self) {
    if self.flash.as_ref().is_some_and(|(_, at)| at.elapsed() > FLASH_TTL) {
      self.flash = None;
    }
  }

  /// The notice the status line shows: a local flash wins over the engine's last notice.
  pub(super) fn current_notice(&self) -> Option<&Notice> {
    self.flash.as_ref().map(|(notice, _)| notice).or_else(|| self.orchestrator.notice())
  }

  pub(super) fn focused_column(&self) -> Option<&ColumnDefinition> {
    let count = self.orchestrator.visible_columns().count();
    self.orchestrator.visible_columns().nth(self.selected_column_index.min(count.saturating_sub(1)))
  }

  pub(super) fn focused_column_id(&self) -> Option<String> {
    self.focused_column().map(|c| c.id.clone())
  }

  /// Columns shown in the create/edit form, in schema order.
  pub(super) fn dialog_fields(&self) -> &[ColumnDefinition] {
    self.orchestrator.columns()
  }

  /// Primary key fields are read-only while editing an existing row.
  pub(super) fn is_field_locked(&self, column: &ColumnDefinition) -> bool {
    matches!(self.orchestrator.dialog().mode(), Some(DialogMode::Edit { .. })) && column.is_primary_key
  }

  pub(super) fn first_editable_field(&self) -> usize {
    self.dialog_fields().iter().position(|c| !self.is_field_locked(c)).unwrap_or(0)
  }

  /// Moves the form focus one field, wrapping and skipping locked fields.
  pub(super) fn move_dialog_focus(&mut self, forward: bool) {
    let count = self.dialog_fields().len();
    if count == 0 {
      return;
    }
    let mut index = self.dialog_focus;
    for _ in 0..count {
      index = if forward { (index + 1) % count } else { (index + count - 1) % count };
      if !self.is_field_locked(&self.dialog_fields()[index]) {
        self.dialog_focus = index;
        return;
      }
    }
  }

  pub(super) fn focused_field(&self) -> Option<&ColumnDefinition> {
    self.dialog_fields().get(self.dialog_focus)
  }

  /// Text currently pending for a text field, empty when untouched.
  pub(super) fn pending_text(&self, column: &str) -> String {
    match self.orchestrator.dialog().buffer().and_then(|b| b.get(column)) {
      Some(EditValue::Text(text)) => text.clone(),
      _ => String::new(),
    }
  }

  pub(super) fn selected_row(&self) -> Option<&RecordRow> {
    self.orchestrator.row(self.selected_row_index)
  }

  pub(super) fn row_as_json(&self) -> Option<String> {
    let row = self.selected_row()?;
    serde_json::to_string_pretty(row).ok()
  }

  pub(super) fn copy_row_as_json(&mut self) {
    let Some(json) = self.row_as_json() else {
      return;
    };
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(json)) {
      Ok(()) => self.flash_info("Row copied to clipboard"),
      Err(e) => {
        warn!("clipboard unavailable: {e}");
        self.flash_error(format!("Copy failed: {e}"));
      },
    }
  }

  /// Width each visible data column wants: its header or widest cell, clamped.
  pub(super) fn column_widths(&self) -> Vec<u16> {
    let query = self.orchestrator.query();
    self
      .orchestrator
      .visible_columns()
      .map(|column| {
        let header = column.header_view(query).text().chars().count();
        let widest = self
          .orchestrator
          .rows()
          .iter()
          .map(|row| column.render(row.get(&column.id)).text.chars().count())
          .max()
          .unwrap_or(0);
        (header.max(widest) as u16).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
      })
      .collect()
  }

  /// Keeps the focused column inside the window of data columns that fit in `width`.
  pub(super) fn visible_column_window(&mut self, widths: &[u16], width: u16) -> std::ops::Range<usize> {
    if widths.is_empty() {
      return 0..0;
    }
    let focus = self.selected_column_index.min(widths.len() - 1);
    if focus < self.horizontal_scroll_offset {
      self.horizontal_scroll_offset = focus;
    }

    let fits = |start: usize| {
      let mut used = 0u16;
      let mut end = start;
      while end < widths.len() {
        let next = used.saturating_add(widths[end]).saturating_add(1);
        if next > width && end > start {
          break;
        }
        used = next;
        end += 1;
      }
      end
    };

    while fits(self.horizontal_scroll_offset) <= focus {
      self.horizontal_scroll_offset += 1;
    }
    self.horizontal_scroll_offset..fits(self.horizontal_scroll_offset)
  }

  pub(super) fn status_text(&self) -> String {
    let Some(table) = self.orchestrator.current_table() else {
      return match &self.schema_error {
        Some(_) => "Could not load tables".to_string(),
        None if self.tables.is_empty() => "Loading tables...".to_string(),
        None => "Select a table and press Enter".to_string(),
      };
    };

    let query = self.orchestrator.query();
    let mut parts = vec![table.to_string(), format!("page {}", query.page + 1)];
    if let Some(filter) = &query.filter_text {
      parts.push(format!("filter: {filter}"));
    }
    if let Some(sort) = &query.sort {
      parts.push(format!("sort: {} {}", sort.column, sort.direction));
    }
    parts.push(format!("{} rows", self.orchestrator.rows().len()));
    if self.orchestrator.selected_count() > 0 {
      parts.push(format!("{} selected", self.orchestrator.selected_count()));
    }
    if self.orchestrator.has_next_page() {
      parts.push("more ›".to_string());
    }
    if let Some(at) = self.last_refreshed {
      parts.push(format!("refreshed {}", at.format("%H:%M:%S")));
    }
    if self.orchestrator.is_loading() {
      parts.push("loading...".to_string());
    }
    parts.join(" │ ")
  }

  pub(super) fn centered_rect(&self, percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
      ])
      .split(r);

    Layout::default()
      .direction(Direction::Horizontal)
      .constraints([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
      ])
      .split(popup_layout[1])[1]
  }
}
