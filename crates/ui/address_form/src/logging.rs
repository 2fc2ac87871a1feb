use color_eyre::Result;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{LOG_ENV, LOG_FILE, ensure_data_and_config_dirs_exist, get_data_dir};

/// File logger; the terminal itself belongs to the TUI.
///
/// `RUST_LOG` wins over `ADDRESS_FORM_LOG_LEVEL`, default is `info` for this
/// crate and the geocoding client.
pub fn init() -> Result<()> {
    ensure_data_and_config_dirs_exist()?;
    let directory = get_data_dir();
    let log_path = directory.join(LOG_FILE.clone());
    let log_file = std::fs::File::create(log_path)?;

    let env_filter = EnvFilter::builder().with_default_directive(tracing::Level::INFO.into());
    let env_filter = env_filter
        .try_from_env()
        .or_else(|_| env_filter.with_env_var(LOG_ENV.clone()).from_env())?;

    let file_subscriber = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;
    Ok(())
}
