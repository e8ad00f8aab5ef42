use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum SortDirection {
  #[serde(rename = "asc")]
  #[strum(to_string = "asc")]
  Ascending,
  #[serde(rename = "desc")]
  #[strum(to_string = "desc")]
  Descending,
}

impl SortDirection {
  /// Header toggle rule: none -> ascending -> descending -> none.
  pub fn cycle(current: Option<SortDirection>) -> Option<SortDirection> {
    match current {
      None => Some(SortDirection::Ascending),
      Some(SortDirection::Ascending) => Some(SortDirection::Descending),
      Some(SortDirection::Descending) => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
  pub column: String,
  pub direction: SortDirection,
}

/// What the grid is currently asking the backend for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
  pub table_name: String,
  pub page: u32,
  pub filter_text: Option<String>,
  pub sort: Option<SortSpec>,
}

impl QueryState {
  pub fn new(table_name: impl Into<String>) -> Self {
    Self { table_name: table_name.into(), ..Default::default() }
  }

  pub fn sort_direction_of(&self, column: &str) -> Option<SortDirection> {
    self.sort.as_ref().filter(|s| s.column == column).map(|s| s.direction)
  }
}

fn normalize_filter(text: &str) -> Option<String> {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_string())
  }
}

/// Owns the query state of one table view plus its row selection.
///
/// Every setter returns the new snapshot when something changed and `None` when the call was a no-op,
/// so the caller fetches exactly once per real change.
#[derive(Debug, Clone, Default)]
pub struct QueryStateController {
  state: QueryState,
  selection: BTreeSet<usize>,
}

impl QueryStateController {
  pub fn new(table_name: impl Into<String>) -> Self {
    Self { state: QueryState::new(table_name), selection: BTreeSet::new() }
  }

  pub fn state(&self) -> &QueryState {
    &self.state
  }

  pub fn set_filter(&mut self, text: &str) -> Option<QueryState> {
    let next = QueryState { filter_text: normalize_filter(text), page: 0, ..self.state.clone() };
    self.replace(next)
  }

  pub fn set_sort(&mut self, column: &str, direction: Option<SortDirection>) -> Option<QueryState> {
    let sort = direction.map(|direction| SortSpec { column: column.to_string(), direction });
    let next = QueryState { sort, page: 0, ..self.state.clone() };
    self.replace(next)
  }

  pub fn set_page(&mut self, page: u32) -> Option<QueryState> {
    let next = QueryState { page, ..self.state.clone() };
    self.replace(next)
  }

  /// Switches to another table. Filter, sort, page and selection never carry over.
  pub fn reset(&mut self, table_name: &str) -> QueryState {
    self.state = QueryState::new(table_name);
    self.selection.clear();
    self.state.clone()
  }

  fn replace(&mut self, next: QueryState) -> Option<QueryState> {
    if next == self.state {
      return None;
    }
    self.state = next;
    self.selection.clear();
    Some(self.state.clone())
  }

  pub fn selection(&self) -> &BTreeSet<usize> {
    &self.selection
  }

  pub fn is_selected(&self, row: usize) -> bool {
    self.selection.contains(&row)
  }

  pub fn toggle_row(&mut self, row: usize) {
    if !self.selection.remove(&row) {
      self.selection.insert(row);
    }
  }

  /// Selects every row of the page, or clears the selection when all are already selected.
  pub fn toggle_all(&mut self, row_count: usize) {
    if row_count > 0 && self.selection.len() == row_count {
      self.selection.clear();
    } else {
      self.selection = (0..row_count).collect();
    }
  }

  pub fn clear_selection(&mut self) {
    self.selection.clear();
  }
}
