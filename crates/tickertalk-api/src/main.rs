//! TickerTalk CLI and chat server entry point.
//!
//! Binary name: `tickertalk`
//!
//! Parses CLI arguments, loads configuration, wires services, then dispatches
//! to the command handler or starts the WebSocket chat server.

mod cli;
mod http;
mod state;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;
use tickertalk_infra::config::{default_config_path, load_service_config};
use tickertalk_observe::tracing_setup::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Shell completions don't need tracing, config or services
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "tickertalk", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    init_tracing(verbosity_filter(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_service_config(&config_path).await?;

    match cli.command {
        Commands::Train {
            file,
            schema,
            reset,
        } => {
            cli::train::train(&config, &file, schema, reset, cli.json).await?;
        }

        Commands::Ask { question } => {
            let state = AppState::init(config).await?;
            return cli::ask::ask(&state, &question.join(" "), cli.json).await;
        }

        Commands::Chat => {
            let state = AppState::init(config).await?;
            cli::chat::loop_runner::run_chat_loop(&state).await?;
        }

        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let state = AppState::init(config).await?;

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} TickerTalk listening on {}",
                console::style("$").green().bold(),
                console::style(format!("ws://{addr}/ws/chat")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled before startup"),
    }

    Ok(ExitCode::SUCCESS)
}

/// Default log filter for the CLI verbosity flags. `RUST_LOG` overrides it.
fn verbosity_filter(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,tickertalk=debug,tickertalk_core=debug,tickertalk_infra=debug",
        _ => "trace",
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
