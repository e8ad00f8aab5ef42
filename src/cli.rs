use clap::Parser;

use crate::{config::Config, utils::version};

#[derive(Parser, Debug, Default)]
#[command(author, version = version(), about)]
pub struct Cli {
  // Performance tuning options
  #[arg(short, long, value_name = "FLOAT", help = "Tick rate, i.e. number of ticks per second", default_value_t = 1.0)]
  pub tick_rate: f64,

  #[arg(
    short('r'),
    long,
    value_name = "FLOAT",
    help = "Frame rate, i.e. number of frames per second",
    default_value_t = 4.0
  )]
  pub frame_rate: f64,

  // Backend options
  #[arg(short('u'), long = "base-url", value_name = "URL", help = "Base URL of the CRUD backend")]
  pub base_url: Option<String>,

  #[arg(long = "table", value_name = "TABLE", help = "Table to open once the schemas are loaded")]
  pub table: Option<String>,

  #[arg(long = "page-size", value_name = "ROWS", help = "Rows requested per page")]
  pub page_size: Option<u32>,
}

impl Cli {
  /// Command-line values win over the config files.
  pub fn apply(&self, config: &mut Config) {
    if let Some(base_url) = &self.base_url {
      config.grid.base_url = base_url.clone();
    }
    if let Some(page_size) = self.page_size {
      config.grid.page_size = page_size.max(1);
    }
  }
}
