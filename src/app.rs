use std::{sync::Arc, time::Duration};

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::Rect;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
  action::Action,
  cli::Cli,
  components::{grid::Grid, Component},
  config::Config,
  gateway::{Gateway, HttpGateway},
  mode::Mode,
  runner::TaskRunner,
  tui,
};

pub struct App {
  pub config: Config,
  pub tick_rate: f64,
  pub frame_rate: f64,
  pub components: Vec<Box<dyn Component>>,
  pub should_quit: bool,
  pub should_suspend: bool,
  pub mode: Mode,
  pub last_tick_key_events: Vec<KeyEvent>,
  gateway: Arc<dyn Gateway>,
}

impl App {
  pub fn new(cli: &Cli) -> Result<Self> {
    let mut config = Config::new()?;
    cli.apply(&mut config);

    let timeout = Duration::from_millis(config.grid.request_timeout_ms);
    let gateway = HttpGateway::new(&config.grid.base_url, timeout)?;
    info!(base_url = gateway.base_url(), page_size = config.grid.page_size, "starting");

    let grid = Grid::new(config.clone()).with_initial_table(cli.table.clone());

    Ok(Self {
      tick_rate: cli.tick_rate,
      frame_rate: cli.frame_rate,
      components: vec![Box::new(grid)],
      should_quit: false,
      should_suspend: false,
      config,
      mode: Mode::Browse,
      last_tick_key_events: Vec::new(),
      gateway: Arc::new(gateway),
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let mut runner = TaskRunner::new(self.gateway.clone(), action_tx.clone());

    let mut tui = tui::Tui::new()?.tick_rate(self.tick_rate).frame_rate(self.frame_rate);
    tui.enter()?;

    for component in self.components.iter_mut() {
      component.register_action_handler(action_tx.clone())?;
    }

    for component in self.components.iter_mut() {
      component.register_config_handler(self.config.clone())?;
    }

    for component in self.components.iter_mut() {
      component.init(Rect::default())?;
    }

    action_tx.send(Action::LoadSchemas)?;

    loop {
      if let Some(e) = tui.next().await {
        match e {
          tui::Event::Quit => action_tx.send(Action::Quit)?,
          tui::Event::Tick => action_tx.send(Action::Tick)?,
          tui::Event::Render => action_tx.send(Action::Render)?,
          tui::Event::Resize(x, y) => action_tx.send(Action::Resize(x, y))?,
          tui::Event::Key(key) => {
            if let Some(keymap) = self.config.keybindings.get(&self.mode) {
              if let Some(action) = keymap.get(&vec![key]) {
                debug!("Got action: {action:?}");
                action_tx.send(action.clone())?;
              } else {
                // If the key was not handled as a single key action,
                // then consider it for multi-key combinations.
                self.last_tick_key_events.push(key);

                if let Some(action) = keymap.get(&self.last_tick_key_events) {
                  debug!("Got action: {action:?}");
                  action_tx.send(action.clone())?;
                }
              }
            };
          },
          _ => {},
        }
        for component in self.components.iter_mut() {
          if let Some(action) = component.handle_events(Some(e.clone()))? {
            action_tx.send(action)?;
          }
        }
      }

      while let Ok(action) = action_rx.try_recv() {
        if action != Action::Tick && action != Action::Render {
          debug!("{action:?}");
        }
        match action {
          Action::Tick => {
            self.last_tick_key_events.drain(..);
          },
          Action::Quit => self.should_quit = true,
          Action::Suspend => self.should_suspend = true,
          Action::Resume => self.should_suspend = false,
          Action::EnterMode(mode) => {
            self.mode = mode;
            self.last_tick_key_events.clear();
          },
          Action::Resize(w, h) => {
            tui.resize(Rect::new(0, 0, w, h))?;
            self.draw(&mut tui, &action_tx)?;
          },
          Action::Render => {
            self.draw(&mut tui, &action_tx)?;
          },
          Action::LoadSchemas => {
            runner.load_schemas();
          },
          Action::FetchRows(ref request) => {
            runner.fetch(request.clone());
          },
          Action::Mutate(ref request) => {
            runner.mutate(request.clone());
          },
          _ => {},
        }
        for component in self.components.iter_mut() {
          if let Some(action) = component.update(action.clone())? {
            action_tx.send(action)?
          };
        }
      }

      if self.should_suspend {
        tui.suspend()?;
        action_tx.send(Action::Resume)?;
        tui = tui::Tui::new()?.tick_rate(self.tick_rate).frame_rate(self.frame_rate);
        tui.enter()?;
      } else if self.should_quit {
        runner.cancel_fetch();
        tui.stop()?;
        break;
      }
    }
    tui.exit()?;
    Ok(())
  }

  fn draw(&mut self, tui: &mut tui::Tui, action_tx: &mpsc::UnboundedSender<Action>) -> Result<()> {
    tui.draw(|f| {
      for component in self.components.iter_mut() {
        if let Err(e) = component.draw(f, f.area()) {
          // The loop owns the receiver, so this only fails while shutting down.
          let _ = action_tx.send(Action::Error(format!("Failed to draw: {e:?}")));
        }
      }
    })?;
    Ok(())
  }
}
