use anyhow::{Context, Result};
use chrono::Local;
use std::process;
use wxm_export::{Client, ExportConfig, ExportError, RunContext, prompt, run};

fn main() {
    setup_logging();

    match export() {
        Ok(()) => process::exit(0),
        Err(error) => {
            // Run failures print their fixed message only; the cause chain goes to the log.
            if let Some(export_error) = error.downcast_ref::<ExportError>() {
                log_causes(export_error);
                eprintln!("{export_error}");
            } else {
                eprintln!("Error: {:#}", error);
            }
            process::exit(1);
        }
    }
}

fn export() -> Result<()> {
    let config = ExportConfig::from_env()?;
    let client = Client::new(&config)?;

    let credentials = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        prompt::read_credentials(&mut input, &mut output).context("failed to read credentials")?
    };

    let ctx = RunContext::new(&client, &config, Local::now().date_naive());
    let summary = run(&ctx, &credentials)?;
    tracing::info!(
        user_id = %summary.user_id,
        from = %summary.window.from,
        to = %summary.window.to,
        files = summary.files.len(),
        "done"
    );
    Ok(())
}

fn log_causes(error: &ExportError) {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        tracing::debug!(%cause, "caused by");
        source = std::error::Error::source(cause);
    }
}

fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wxm_export=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}
