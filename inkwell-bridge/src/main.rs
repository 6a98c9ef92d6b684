use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

use inkwell_bridge::Cli;
use inkwell_bridge::stats::stats_report;
use inkwell_bridge::util::{init_tracing, install_panic_hook};
use inkwell_core::config::{load_config, load_config_from_path};
use inkwell_core::{Clock, DisplayRenderer, ModeController, SystemClock};
use inkwell_io::{LogDisplay, TerminalDisplay, TerminalKeySource, ensure_dataset};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref(), cli.default_log_level())?;
    install_panic_hook();

    let mut config = match cli.config.clone() {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .context("Failed to load configuration")?;
    cli.apply(&mut config);
    tracing::info!(source = %config.source(), dataset = %config.dataset.path.display(), "Configuration ready");

    let dataset = ensure_dataset(&config.dataset)
        .await
        .context("No quote dataset available")?;
    let dataset = Arc::new(dataset);

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if cli.stats {
        let report = stats_report(
            &dataset,
            SystemClock.now(),
            config.controller.fallback,
            &mut rng,
        );
        print!("{report}");
        return Ok(());
    }

    let (keys, interrupts) = match TerminalKeySource::start(&config.keyboard) {
        Ok(started) => started,
        Err(e) => {
            tracing::warn!(error = %e, "No keyboard at startup; running as a clock");
            TerminalKeySource::detached(&config.keyboard)
        }
    };

    let display: Box<dyn DisplayRenderer> = if cli.headless {
        Box::new(LogDisplay::new())
    } else {
        Box::new(TerminalDisplay::stdout().context("Failed to open terminal display")?)
    };

    let mut controller = ModeController::new(
        config.controller,
        dataset,
        Box::new(keys),
        display,
        Box::new(SystemClock),
        Box::new(rng),
    );

    controller.run_until(shutdown_signal(interrupts)).await;
    drop(controller);
    tracing::info!("Inkwell stopped");
    Ok(())
}

/// Resolves on Ctrl+C from the OS or from the raw-mode keyboard.
async fn shutdown_signal(mut interrupts: mpsc::Receiver<()>) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received Ctrl+C");
        }
        Some(()) = interrupts.recv() => tracing::info!("Interrupt typed on keyboard"),
    }
}
