use schema_grid::{components::grid::Grid, mode::Mode};

pub trait StateAssertions {
    fn assert_mode(&self, expected: Mode);
    fn assert_table(&self, expected: &str);
    fn assert_row_count(&self, expected: usize);
    fn assert_notice(&self, expected: &str);
    fn assert_no_load_error(&self);
}

impl StateAssertions for Grid {
    fn assert_mode(&self, expected: Mode) {
        assert_eq!(self.mode, expected, "grid is in the wrong mode");
    }

    fn assert_table(&self, expected: &str) {
        assert_eq!(self.orchestrator.current_table(), Some(expected));
    }

    fn assert_row_count(&self, expected: usize) {
        assert_eq!(
            self.orchestrator.rows().len(),
            expected,
            "rows on screen: {:?}",
            self.orchestrator.rows()
        );
    }

    fn assert_notice(&self, expected: &str) {
        let notice = self
            .flash
            .as_ref()
            .map(|(notice, _)| notice)
            .or_else(|| self.orchestrator.notice())
            .unwrap_or_else(|| panic!("expected a notice containing '{expected}'"));
        assert!(notice.text.contains(expected), "notice was '{}'", notice.text);
    }

    fn assert_no_load_error(&self) {
        assert!(self.orchestrator.load_error().is_none(), "{:?}", self.orchestrator.load_error());
    }
}

pub trait RenderAssertions {
    fn assert_contains(&self, text: &str);
    fn assert_not_contains(&self, text: &str);
    fn assert_line_contains(&self, line: usize, text: &str);
}

impl RenderAssertions for Vec<String> {
    fn assert_contains(&self, text: &str) {
        let full_content = self.join("\n");
        assert!(full_content.contains(text), "Expected to find '{}' in rendered output:\n{}", text, full_content);
    }

    fn assert_not_contains(&self, text: &str) {
        let full_content = self.join("\n");
        assert!(!full_content.contains(text), "Expected NOT to find '{}' in rendered output:\n{}", text, full_content);
    }

    fn assert_line_contains(&self, line: usize, text: &str) {
        assert!(line < self.len(), "Line {} is out of bounds (total lines: {})", line, self.len());
        assert!(self[line].contains(text), "Expected line {} to contain '{}', but got: '{}'", line, text, self[line]);
    }
}
