use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config;
use crate::feed::{SampleSource, StatusSource};
use crate::logging;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;

    if let Some(log_file) = cfg.log.file.clone() {
        logging::init(&log_file).context("init logging")?;
    }
    info!(version = crate::VERSION, "starting chirp-tui");

    // The offline sample source stands in until a real service client is
    // wired up here.
    let source: Arc<dyn StatusSource> = Arc::new(SampleSource::new());

    let mut model = ui::Model::new(ui::Options {
        config: cfg,
        source,
    });
    model.run()
}
