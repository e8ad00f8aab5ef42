use serde::{Deserialize, Serialize};
use strum::Display;

/// Which input handler owns the keyboard. Only `Browse` is driven by the keybinding table.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Mode {
  #[default]
  Browse,
  Filter,
  Dialog,
  Confirm,
  Columns,
  Inspect,
}
