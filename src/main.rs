use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use form_autofill::cli::commands::{
    CommandContext, cmd_batch, cmd_fill, cmd_inspect, cmd_sample, cmd_validate,
};
use form_autofill::cli::config::{Cli, Commands, load_config};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// First Ctrl-C stops the batch between forms so its report still gets
/// written; a second one exits immediately.
fn install_interrupt() -> Arc<AtomicBool> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    let installed = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("Interrupted, finishing after the current form (Ctrl-C again to quit)");
    });
    if let Err(e) = installed {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
    interrupt
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref());

    // Resolve Ollama settings: CLI > config > env > defaults
    let ctx = CommandContext {
        config: &config,
        tree: cli.tree.as_deref(),
        ollama_endpoint: cli.ollama_endpoint.as_deref(),
        ollama_model: cli.ollama_model.as_deref(),
    };

    let succeeded = match cli.command {
        Commands::Fill {
            data,
            app,
            preset,
            style,
            format,
        } => cmd_fill(
            ctx,
            &data,
            app.as_deref(),
            &preset,
            style.as_deref(),
            format.as_deref(),
        )?,
        Commands::Batch {
            data,
            app,
            preset,
            pacing,
            report,
            output,
        } => {
            let interrupt = install_interrupt();
            cmd_batch(
                ctx,
                &data,
                app.as_deref(),
                &preset,
                pacing,
                &report,
                output.as_deref(),
                &interrupt,
            )?
        }
        Commands::Inspect {
            app,
            format,
            depth,
            output,
        } => cmd_inspect(ctx, app.as_deref(), &format, depth, output.as_deref())?,
        Commands::Validate { data, preset } => cmd_validate(&data, &preset)?,
        Commands::Sample { output } => cmd_sample(&output)?,
    };

    if !succeeded {
        std::process::exit(1);
    }

    Ok(())
}
