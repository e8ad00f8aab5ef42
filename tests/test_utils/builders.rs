use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

/// Builds key sequences the way a user would type them.
pub struct EventBuilder {
    events: Vec<KeyEvent>,
}

fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent { code, modifiers, kind: KeyEventKind::Press, state: KeyEventState::empty() }
}

impl EventBuilder {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn key(mut self, key: char) -> Self {
        let modifiers = if key.is_ascii_uppercase() { KeyModifiers::SHIFT } else { KeyModifiers::empty() };
        self.events.push(press(KeyCode::Char(key), modifiers));
        self
    }

    pub fn ctrl(mut self, key: char) -> Self {
        self.events.push(press(KeyCode::Char(key), KeyModifiers::CONTROL));
        self
    }

    pub fn keys(mut self, keys: &str) -> Self {
        for ch in keys.chars() {
            self = self.key(ch);
        }
        self
    }

    pub fn code(mut self, code: KeyCode) -> Self {
        self.events.push(press(code, KeyModifiers::empty()));
        self
    }

    pub fn enter(self) -> Self {
        self.code(KeyCode::Enter)
    }

    pub fn esc(self) -> Self {
        self.code(KeyCode::Esc)
    }

    pub fn up(self) -> Self {
        self.code(KeyCode::Up)
    }

    pub fn down(self) -> Self {
        self.code(KeyCode::Down)
    }

    pub fn tab(self) -> Self {
        self.code(KeyCode::Tab)
    }

    pub fn backspace(self) -> Self {
        self.code(KeyCode::Backspace)
    }

    pub fn build(self) -> Vec<KeyEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let events = EventBuilder::new().keys("Ann").ctrl('u').enter().build();

        assert_eq!(events.len(), 5);
        assert_eq!(events[0].code, KeyCode::Char('A'));
        assert_eq!(events[0].modifiers, KeyModifiers::SHIFT);
        assert_eq!(events[3].modifiers, KeyModifiers::CONTROL);
        assert_eq!(events[4].code, KeyCode::Enter);
    }
}
