use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::Grid;
use crate::{
  action::Action,
  engine::{EditInput, EditValue},
  mode::Mode,
};

impl Grid {
  pub(super) fn handle_events(&mut self, event: Option<crate::tui::Event>) -> Result<Option<Action>> {
    if let Some(crate::tui::Event::Key(key)) = event {
      self.handle_key_events(key)
    } else {
      Ok(None)
    }
  }

  /// Keys the keymap doesn't own. Browse keys are bound in the config; the
  /// other modes capture raw input here.
  pub(super) fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<Action>> {
    match self.mode {
      Mode::Browse => Ok(self.handle_browse_key(key)),
      Mode::Filter => Ok(self.handle_filter_key(key)),
      Mode::Dialog => Ok(self.handle_dialog_key(key)),
      Mode::Confirm => Ok(self.handle_confirm_key(key)),
      Mode::Columns => Ok(self.handle_columns_key(key)),
      Mode::Inspect => Ok(self.handle_inspect_key(key)),
    }
  }

  fn handle_browse_key(&mut self, key: KeyEvent) -> Option<Action> {
    if key.code != KeyCode::Esc {
      return None;
    }
    if self.show_help {
      self.show_help = false;
    } else if self.flash.is_some() {
      self.flash = None;
    } else {
      self.orchestrator.dismiss_notice();
    }
    Some(Action::Render)
  }

  fn handle_filter_key(&mut self, key: KeyEvent) -> Option<Action> {
    match key.code {
      KeyCode::Esc => Some(self.enter_mode(Mode::Browse)),
      KeyCode::Enter => {
        let fetch = self.orchestrator.set_filter(&self.filter_input);
        let back = self.enter_mode(Mode::Browse);
        match fetch {
          Some(request) => {
            self.selected_row_index = 0;
            self.send(back);
            Some(Action::FetchRows(request))
          },
          None => Some(back),
        }
      },
      KeyCode::Backspace => {
        self.filter_input.pop();
        Some(Action::Render)
      },
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.filter_input.clear();
        Some(Action::Render)
      },
      KeyCode::Char(c) => {
        self.filter_input.push(c);
        Some(Action::Render)
      },
      _ => None,
    }
  }

  fn handle_dialog_key(&mut self, key: KeyEvent) -> Option<Action> {
    // Input is frozen until the backend answers.
    if self.orchestrator.dialog().is_submitting() {
      return None;
    }

    match key.code {
      KeyCode::Esc => {
        if self.orchestrator.cancel_dialog() {
          return Some(self.enter_mode(Mode::Browse));
        }
        None
      },
      KeyCode::Enter => self.orchestrator.submit().map(Action::Mutate).or(Some(Action::Render)),
      KeyCode::Down | KeyCode::Tab => {
        self.move_dialog_focus(true);
        Some(Action::Render)
      },
      KeyCode::Up | KeyCode::BackTab => {
        self.move_dialog_focus(false);
        Some(Action::Render)
      },
      _ => {
        let field = self.focused_field()?.clone();
        if self.is_field_locked(&field) {
          return None;
        }
        let changed = match (field.input, key.code) {
          (EditInput::TriState, KeyCode::Char(' ')) => self.orchestrator.cycle_flag(&field.id),
          (EditInput::TriState, _) => false,
          (_, KeyCode::Backspace) => {
            let mut text = self.pending_text(&field.id);
            text.pop();
            self.orchestrator.edit_field(&field.id, EditValue::Text(text))
          },
          (_, KeyCode::Char(c)) => {
            let mut text = self.pending_text(&field.id);
            text.push(c);
            self.orchestrator.edit_field(&field.id, EditValue::Text(text))
          },
          _ => false,
        };
        changed.then_some(Action::Render)
      },
    }
  }

  fn handle_confirm_key(&mut self, key: KeyEvent) -> Option<Action> {
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
        let request = self.orchestrator.confirm_delete();
        let back = self.enter_mode(Mode::Browse);
        match request {
          Some(request) => {
            self.send(back);
            Some(Action::Mutate(request))
          },
          None => Some(back),
        }
      },
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
        self.orchestrator.cancel_delete();
        Some(self.enter_mode(Mode::Browse))
      },
      _ => None,
    }
  }

  fn handle_columns_key(&mut self, key: KeyEvent) -> Option<Action> {
    let count = self.orchestrator.columns().len();
    match key.code {
      KeyCode::Esc | KeyCode::Char('v') | KeyCode::Char('q') => Some(self.enter_mode(Mode::Browse)),
      KeyCode::Down | KeyCode::Char('j') => {
        if count > 0 {
          self.columns_menu_index = (self.columns_menu_index + 1) % count;
        }
        Some(Action::Render)
      },
      KeyCode::Up | KeyCode::Char('k') => {
        if count > 0 {
          self.columns_menu_index = (self.columns_menu_index + count - 1) % count;
        }
        Some(Action::Render)
      },
      KeyCode::Char(' ') | KeyCode::Enter => {
        let id = self.orchestrator.columns().get(self.columns_menu_index)?.id.clone();
        if self.orchestrator.toggle_column(&id) {
          let visible = self.orchestrator.visible_columns().count();
          self.selected_column_index = self.selected_column_index.min(visible.saturating_sub(1));
          self.horizontal_scroll_offset = self.horizontal_scroll_offset.min(self.selected_column_index);
        }
        Some(Action::Render)
      },
      _ => None,
    }
  }

  fn handle_inspect_key(&mut self, key: KeyEvent) -> Option<Action> {
    match key.code {
      KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('i') => Some(self.enter_mode(Mode::Browse)),
      KeyCode::Down | KeyCode::Char('j') => {
        self.inspect_scroll = self.inspect_scroll.saturating_add(1);
        Some(Action::Render)
      },
      KeyCode::Up | KeyCode::Char('k') => {
        self.inspect_scroll = self.inspect_scroll.saturating_sub(1);
        Some(Action::Render)
      },
      KeyCode::Home | KeyCode::Char('g') => {
        self.inspect_scroll = 0;
        Some(Action::Render)
      },
      _ => None,
    }
  }
}
