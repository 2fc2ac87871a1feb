use std::{panic::PanicHookInfo, sync::OnceLock};

use color_eyre::{Result, config::PanicHook};
use tracing::error;

use crate::config::{LOG_FILE, get_data_dir};

static INIT: OnceLock<()> = OnceLock::new();

/// Text appended to every panic report.
pub fn panic_section() -> String {
    format!(
        "address-form crashed. The log at {} has the lookups and form events leading up to it.",
        get_data_dir().join(LOG_FILE.as_str()).display()
    )
}

/// Install the color-eyre report hook and a panic hook that restores the
/// terminal before anything is printed. Later calls are no-ops.
pub fn init() -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .panic_section(panic_section())
        .capture_span_trace_by_default(false)
        .display_location_section(false)
        .display_env_section(false)
        .try_into_hooks()?;
    eyre_hook.install()?;

    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        report(&panic_hook, info);
        std::process::exit(libc::EXIT_FAILURE);
    }));

    let _ = INIT.set(());
    Ok(())
}

/// Leave raw mode and the alternate screen so the report is readable.
fn restore_terminal() {
    if let Ok(mut tui) = crate::tui::Tui::new() {
        if let Err(err) = tui.exit() {
            error!("Unable to restore the terminal: {err:?}");
        }
    }
}

fn report(panic_hook: &PanicHook, info: &PanicHookInfo<'_>) {
    let report = panic_hook.panic_report(info).to_string();
    error!("panic: {}", strip_ansi_escapes::strip_str(&report));

    #[cfg(not(debug_assertions))]
    {
        use human_panic::{handle_dump, metadata, print_msg};
        let metadata = metadata!().support(panic_section());
        let dump = handle_dump(&metadata, info);
        if print_msg(dump, &metadata).is_err() {
            eprintln!("{report}");
        }
    }

    #[cfg(debug_assertions)]
    {
        better_panic::Settings::auto()
            .most_recent_first(false)
            .lineno_suffix(true)
            .verbosity(better_panic::Verbosity::Full)
            .create_panic_handler()(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_section_names_the_log_file() {
        let section = panic_section();
        assert!(section.starts_with("address-form crashed."));
        assert!(section.contains("address_form.log"));
    }
}
