use std::{collections::VecDeque, sync::Arc};

use crossterm::event::KeyEvent;

use schema_grid::{
    action::Action,
    components::grid::Grid,
    config::Config,
    engine::{FetchOutcome, MutationOutcome},
    gateway::Gateway,
    mode::Mode,
    runner::execute,
};

use super::{ComponentTestHarness, FakeGateway};

/// Drives a [`Grid`] the way the app loop does, answering backend requests from a [`FakeGateway`] inline.
pub struct Session {
    pub harness: ComponentTestHarness<Grid>,
    pub gateway: Arc<FakeGateway>,
    pub config: Config,
    pub mode: Mode,
}

impl Session {
    pub async fn start(gateway: FakeGateway) -> Self {
        Self::start_with(gateway, Config::embedded().unwrap()).await
    }

    pub async fn start_with(gateway: FakeGateway, config: Config) -> Self {
        let grid = Grid::new(config.clone());
        let harness = ComponentTestHarness::new(grid).unwrap().with_config(config.clone()).unwrap();
        let mut session = Self { harness, gateway: Arc::new(gateway), config, mode: Mode::Browse };
        session.dispatch(Action::LoadSchemas).await;
        session
    }

    pub fn grid(&self) -> &Grid {
        &self.harness.component
    }

    pub async fn open(&mut self, table: &str) {
        self.dispatch(Action::OpenTable(table.to_string())).await;
    }

    /// Runs `action` and everything it triggers until the loop goes quiet.
    pub async fn dispatch(&mut self, action: Action) {
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            match &action {
                Action::LoadSchemas => queue.push_back(Action::SchemasLoaded(self.gateway.tables().await)),
                Action::FetchRows(request) => {
                    let result = self.gateway.list(&request.query, request.limit).await;
                    queue.push_back(Action::RowsLoaded(FetchOutcome::new(request, result)));
                },
                Action::Mutate(request) => {
                    let result = execute(self.gateway.as_ref(), request).await;
                    queue.push_back(Action::MutationCompleted(MutationOutcome::new(request, result)));
                },
                Action::EnterMode(mode) => self.mode = *mode,
                _ => {},
            }
            if let Some(next) = self.harness.update(action).unwrap() {
                queue.push_back(next);
            }
            queue.extend(self.harness.drain_actions());
        }
    }

    /// One key press: the keymap of the current mode first, then the component's own handling.
    pub async fn press(&mut self, key: KeyEvent) {
        let bound = self.config.keybindings.get(&self.mode).and_then(|keymap| keymap.get(&vec![key])).cloned();
        let handled = self.harness.send_key_event(key).unwrap();
        let pushed = self.harness.drain_actions();

        for action in bound.into_iter().chain(pushed).chain(handled) {
            self.dispatch(action).await;
        }
    }

    pub async fn type_keys(&mut self, keys: Vec<KeyEvent>) {
        for key in keys {
            self.press(key).await;
        }
    }

    pub fn screen(&mut self) -> Vec<String> {
        self.harness.render_lines().unwrap()
    }

    /// The value of `column` in each row on screen, in order.
    pub fn column(&self, column: &str) -> Vec<serde_json::Value> {
        self.grid()
            .orchestrator
            .rows()
            .iter()
            .map(|row| row.get(column).cloned().unwrap_or_default())
            .collect()
    }
}
