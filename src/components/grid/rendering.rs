use color_eyre::eyre::Result;
use ratatui::{
  prelude::*,
  text::{Line, Span},
  widgets::*,
};

use super::Grid;
use crate::{
  components::Frame,
  engine::{Align, DeleteState, DialogMode, EditInput, EditValue, GridColumn, RowAction},
  mode::Mode,
};
use schema_grid_theme as theme;

const SELECTION_WIDTH: u16 = 3;

impl Grid {
  pub(super) fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
    let constraints = if self.mode == Mode::Filter {
      vec![Constraint::Min(1), Constraint::Length(3), Constraint::Length(1)]
    } else {
      vec![Constraint::Min(1), Constraint::Length(1)]
    };
    let chunks = Layout::default().direction(Direction::Vertical).constraints(constraints).split(area);

    let panes = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(20), Constraint::Percentage(80)])
      .split(chunks[0]);

    self.render_table_list(f, panes[0]);
    self.render_grid(f, panes[1]);

    if self.mode == Mode::Filter {
      self.render_filter_input(f, chunks[1]);
    }
    self.render_status_line(f, chunks[chunks.len() - 1]);

    match self.mode {
      Mode::Dialog => self.render_dialog(f, area),
      Mode::Confirm => self.render_confirm(f, area),
      Mode::Columns => self.render_columns_menu(f, area),
      Mode::Inspect => self.render_inspect(f, area),
      Mode::Browse | Mode::Filter => {},
    }
    if self.show_help {
      self.render_help(f, area);
    }
    Ok(())
  }

  fn render_table_list(&self, f: &mut Frame<'_>, area: Rect) {
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(theme::border_normal())
      .title("Tables")
      .title_style(theme::title())
      .border_type(BorderType::Rounded);

    if let Some(err) = &self.schema_error {
      let message = Paragraph::new(Text::styled(err.clone(), theme::error()))
        .block(block)
        .wrap(Wrap { trim: true });
      f.render_widget(message, area);
      return;
    }

    let current = self.orchestrator.current_table();
    let items: Vec<ListItem> = self
      .tables
      .iter()
      .map(|t| {
        let style = if Some(t.as_str()) == current { theme::header() } else { theme::bg_primary() };
        ListItem::new(Span::styled(t.clone(), style))
      })
      .collect();

    let mut state = ListState::default();
    if !self.tables.is_empty() {
      state.select(Some(self.selected_table_index));
    }
    let list = List::new(items).block(block).style(theme::bg_primary()).highlight_style(theme::selection_active());
    f.render_stateful_widget(list, area, &mut state);
  }

  fn render_grid(&mut self, f: &mut Frame<'_>, area: Rect) {
    let title = match self.orchestrator.current_table() {
      Some(table) if self.orchestrator.is_loading() => format!("{table} - Loading..."),
      Some(table) => format!("{table} ({} cols)", self.orchestrator.visible_columns().count()),
      None => "Rows".to_string(),
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(theme::border(self.mode == Mode::Browse))
      .title(title)
      .title_style(theme::title())
      .border_type(BorderType::Rounded);

    if let Some(err) = self.orchestrator.fatal_error() {
      let panel = Paragraph::new(vec![
        Line::from(Span::styled("This table can't be shown", theme::error())),
        Line::from(""),
        Line::from(err.to_string()),
      ])
      .block(block.border_style(theme::error()))
      .alignment(Alignment::Center)
      .wrap(Wrap { trim: true });
      f.render_widget(panel, area);
      return;
    }

    if self.orchestrator.current_table().is_none() {
      let hint = Paragraph::new("Pick a table on the left and press Enter")
        .block(block)
        .style(theme::muted())
        .alignment(Alignment::Center);
      f.render_widget(hint, area);
      return;
    }

    if self.orchestrator.rows().is_empty() {
      let message = if self.orchestrator.is_loading() { "Loading rows..." } else { "No rows" };
      let empty = Paragraph::new(message).block(block).style(theme::muted()).alignment(Alignment::Center);
      f.render_widget(empty, area);
      return;
    }

    let actions = self.orchestrator.row_actions();
    let actions_label = actions.iter().map(action_label).collect::<Vec<_>>().join(" ");
    let actions_width = actions_label.chars().count() as u16;

    let widths = self.column_widths();
    let data_width = area.width.saturating_sub(SELECTION_WIDTH + actions_width + 4);
    let window = self.visible_column_window(&widths, data_width);
    let focus = self.selected_column_index;

    let query = self.orchestrator.query();
    let grid_columns = self.orchestrator.grid_columns();
    let shown: Vec<(usize, GridColumn<'_>)> = grid_columns
      .into_iter()
      .scan(0usize, |data_index, column| {
        let index = *data_index;
        if matches!(column, GridColumn::Data(_)) {
          *data_index += 1;
        }
        Some((index, column))
      })
      .filter(|(index, column)| !matches!(column, GridColumn::Data(_)) || window.contains(index))
      .collect();

    let all_selected = self.orchestrator.selected_count() == self.orchestrator.rows().len();
    let header_cells = shown.iter().map(|(index, column)| match column {
      GridColumn::Selection => Cell::from(if all_selected { "[x]" } else { "[ ]" }),
      GridColumn::Data(definition) => {
        let view = definition.header_view(query);
        let style = if *index == focus {
          theme::field_focused()
        } else if view.direction.is_some() {
          theme::header_sorted()
        } else {
          theme::header()
        };
        Cell::from(Span::styled(view.text(), style))
      },
      GridColumn::Actions => Cell::from("Actions"),
    });
    let header = Row::new(header_cells).style(theme::header()).bottom_margin(1);

    let rows = self.orchestrator.rows().iter().enumerate().map(|(row_index, row)| {
      let marked = self.orchestrator.is_selected(row_index);
      let cells = shown.iter().map(|(_, column)| match column {
        GridColumn::Selection => Cell::from(if marked { "[x]" } else { "[ ]" }),
        GridColumn::Data(definition) => {
          let cell = definition.render(row.get(&definition.id));
          let style = if cell.is_null { theme::null_value() } else { theme::bg_primary() };
          Cell::from(Line::from(Span::styled(cell.text, style)).alignment(alignment(cell.align)))
        },
        GridColumn::Actions => Cell::from(Span::styled(actions_label.clone(), theme::muted())),
      });
      let row = Row::new(cells);
      if marked {
        row.style(theme::row_marked())
      } else {
        row
      }
    });

    let constraints = shown.iter().map(|(index, column)| match column {
      GridColumn::Selection => Constraint::Length(SELECTION_WIDTH),
      GridColumn::Data(_) => Constraint::Length(widths.get(*index).copied().unwrap_or(8)),
      GridColumn::Actions => Constraint::Length(actions_width.max(7)),
    });

    let mut state = TableState::default();
    state.select(Some(self.selected_row_index));
    let table = Table::new(rows, constraints)
      .header(header)
      .block(block)
      .row_highlight_style(theme::selection_active())
      .style(theme::bg_primary())
      .column_spacing(1);
    f.render_stateful_widget(table, area, &mut state);
  }

  fn render_filter_input(&self, f: &mut Frame<'_>, area: Rect) {
    let block = Block::default()
      .borders(Borders::ALL)
      .title("Filter - Enter to apply, Esc to cancel")
      .title_style(theme::title())
      .border_style(theme::border_focused())
      .border_type(BorderType::Rounded);
    let input = Paragraph::new(format!("{}_", self.filter_input)).block(block).style(theme::input());
    f.render_widget(input, area);
  }

  fn render_status_line(&self, f: &mut Frame<'_>, area: Rect) {
    let mut spans = vec![Span::styled(self.status_text(), theme::status_bar())];

    let styles = self.config.styles.get(&Mode::Browse);
    let notice_style = styles.and_then(|s| s.get("notice")).copied().unwrap_or_else(theme::success);
    let error_style = styles.and_then(|s| s.get("error")).copied().unwrap_or_else(theme::error);

    if let Some(err) = self.orchestrator.load_error() {
      spans.push(Span::raw(" │ "));
      spans.push(Span::styled(format!("fetch failed: {}", err.message()), error_style));
    } else if let Some(notice) = self.current_notice() {
      spans.push(Span::raw(" │ "));
      spans.push(Span::styled(notice.text.clone(), if notice.is_error { error_style } else { notice_style }));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).style(theme::status_bar()), area);
  }

  fn render_dialog(&self, f: &mut Frame<'_>, area: Rect) {
    let dialog = self.orchestrator.dialog();
    let Some(mode) = dialog.mode() else {
      return;
    };
    let table = self.orchestrator.current_table().unwrap_or_default();
    let mut title = match mode {
      DialogMode::Create => format!("New row in {table}"),
      DialogMode::Edit { pk } => format!("Edit {table} {pk}"),
    };
    if dialog.is_submitting() {
      title.push_str(" - Saving...");
    }

    let popup = self.centered_rect(60, 70, area);
    f.render_widget(Clear, popup);

    let mut lines = vec![];
    if let Some(err) = dialog.pending_error() {
      lines.push(Line::from(Span::styled(format!("Backend rejected the change: {err}"), theme::error())));
      lines.push(Line::from(""));
    }

    for (index, column) in self.dialog_fields().iter().enumerate() {
      let focused = index == self.dialog_focus;
      let locked = self.is_field_locked(column);
      let value = match (column.input, dialog.buffer().and_then(|b| b.get(&column.id))) {
        (EditInput::TriState, Some(EditValue::Flag(flag))) => flag_label(*flag).to_string(),
        (EditInput::TriState, _) => flag_label(None).to_string(),
        (_, Some(EditValue::Text(text))) => text.clone(),
        _ => String::new(),
      };
      let cursor = if focused && !locked && column.input != EditInput::TriState { "_" } else { "" };
      let value_style = if locked {
        theme::muted()
      } else if focused {
        theme::field_focused()
      } else {
        theme::input()
      };

      let mut spans = vec![
        Span::styled(if focused { "> " } else { "  " }, theme::header()),
        Span::styled(format!("{}: ", column.label), theme::header()),
        Span::styled(format!("{value}{cursor}"), value_style),
      ];
      if locked {
        spans.push(Span::styled("  (key)", theme::muted()));
      }
      lines.push(Line::from(spans));
      if let Some(err) = dialog.field_error(&column.id) {
        lines.push(Line::from(Span::styled(format!("    {err}"), theme::error())));
      }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      "Enter save · Esc cancel · Tab/↑/↓ move · Space toggles yes/no fields",
      theme::muted(),
    )));

    let block = Block::default()
      .title(title)
      .title_style(theme::title())
      .borders(Borders::ALL)
      .border_style(theme::border_focused())
      .border_type(BorderType::Rounded);
    f.render_widget(Paragraph::new(lines).block(block).style(theme::bg_primary()).wrap(Wrap { trim: false }), popup);
  }

  fn render_confirm(&self, f: &mut Frame<'_>, area: Rect) {
    let label = match self.orchestrator.delete_state() {
      DeleteState::Confirming { label, .. } => label.clone(),
      DeleteState::Deleting { pk } => format!("Deleting {pk}..."),
      DeleteState::Idle => return,
    };
    let popup = self.centered_rect(50, 20, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
      .title("Delete row")
      .borders(Borders::ALL)
      .border_style(theme::warning())
      .border_type(BorderType::Rounded);
    let text = vec![
      Line::from(Span::styled(format!("Delete {label}?"), theme::warning())),
      Line::from(""),
      Line::from(Span::styled("y confirm · n cancel", theme::muted())),
    ];
    f.render_widget(
      Paragraph::new(text).block(block).alignment(Alignment::Center).wrap(Wrap { trim: true }),
      popup,
    );
  }

  fn render_columns_menu(&self, f: &mut Frame<'_>, area: Rect) {
    let popup = self.centered_rect(40, 60, area);
    f.render_widget(Clear, popup);

    let items: Vec<ListItem> = self
      .orchestrator
      .columns()
      .iter()
      .map(|c| {
        let mark = if self.orchestrator.is_hidden(&c.id) { "[ ]" } else { "[x]" };
        ListItem::new(format!("{mark} {} ({})", c.label, c.column_type))
      })
      .collect();
    let mut state = ListState::default();
    state.select(Some(self.columns_menu_index));

    let block = Block::default()
      .title("Columns - Space toggles, Esc closes")
      .title_style(theme::title())
      .borders(Borders::ALL)
      .border_style(theme::border_focused())
      .border_type(BorderType::Rounded);
    let list = List::new(items).block(block).style(theme::bg_primary()).highlight_style(theme::selection_active());
    f.render_stateful_widget(list, popup, &mut state);
  }

  fn render_inspect(&self, f: &mut Frame<'_>, area: Rect) {
    let Some(json) = self.row_as_json() else {
      return;
    };
    let popup = self.centered_rect(70, 80, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
      .title("Row - y copy, Esc close")
      .title_style(theme::title())
      .borders(Borders::ALL)
      .border_style(theme::border_focused())
      .border_type(BorderType::Rounded);
    let body = Paragraph::new(json).block(block).style(theme::bg_primary()).scroll((self.inspect_scroll, 0));
    f.render_widget(body, popup);
  }

  fn render_help(&self, f: &mut Frame<'_>, area: Rect) {
    let popup = self.centered_rect(70, 80, area);
    f.render_widget(Clear, popup);

    let section = |name: &'static str| Line::from(Span::styled(name, theme::header()));
    let help_text = vec![
      section("Tables"),
      Line::from("J/K - Previous/next table"),
      Line::from("Enter - Open table"),
      Line::from(""),
      section("Rows"),
      Line::from("↑/↓, k/j - Move between rows"),
      Line::from("←/→, h/l - Move between columns"),
      Line::from("s - Cycle sort on the focused column"),
      Line::from("/ - Filter"),
      Line::from("n/p - Next/previous page"),
      Line::from("Space - Select row, a - select all"),
      Line::from("v - Show or hide columns"),
      Line::from("r - Refresh"),
      Line::from(""),
      section("Row actions"),
      Line::from("c - Create row"),
      Line::from("e - Edit row"),
      Line::from("d - Delete row"),
      Line::from("i - Inspect row"),
      Line::from("y - Copy row as JSON"),
      Line::from(""),
      section("General"),
      Line::from("? - Toggle this help"),
      Line::from("Esc - Close popup or message"),
      Line::from("q - Quit"),
    ];

    let block = Block::default()
      .title("Help - Press ? to close")
      .borders(Borders::ALL)
      .border_style(theme::border_focused())
      .border_type(BorderType::Rounded);
    f.render_widget(Paragraph::new(help_text).block(block).style(theme::bg_primary()), popup);
  }
}

fn alignment(align: Align) -> Alignment {
  match align {
    Align::Left => Alignment::Left,
    Align::Right => Alignment::Right,
    Align::Center => Alignment::Center,
  }
}

fn action_label(action: &RowAction) -> &'static str {
  match action {
    RowAction::Inspect => "inspect",
    RowAction::Edit => "edit",
    RowAction::Delete => "delete",
  }
}

fn flag_label(flag: Option<bool>) -> &'static str {
  match flag {
    Some(true) => "[x] yes",
    Some(false) => "[ ] no",
    None => "[-] unset",
  }
}
