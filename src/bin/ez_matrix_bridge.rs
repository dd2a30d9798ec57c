// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ez-matrix-bridge` - run or poke an EZ Matrix switcher from the shell.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ez_matrix::error::ParseError;
use ez_matrix::{
    BridgeConfig, CommandOutcome, EdidSelect, Entity, EntityContext, HttpConfig, InputPort,
    MatrixIntegration, OutputPort, OutputSelect, Result, StateSynchronizer, SyncConfig,
};

/// Bridge for EZ Matrix HDMI switchers (REST polling + MQTT push)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long, env = "EZ_MATRIX_CONFIG")]
    config: Option<PathBuf>,

    /// Device API URL (overrides the configuration file)
    #[arg(long, env = "EZ_MATRIX_API_URL")]
    api_url: Option<String>,

    /// MQTT broker host (overrides the configuration file)
    #[arg(long, env = "EZ_MATRIX_MQTT_HOST")]
    mqtt_host: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Keep the state in sync and log every change (default)
    Run,
    /// Poll /status once and print it
    Status,
    /// Route an input to an output, e.g. `switch 1 "Input 3"`
    Switch {
        /// Output number (1-2)
        output: u8,
        /// Input label ("Input 1".."Input 4")
        option: String,
    },
    /// Set the EDID index of an input, e.g. `edid 2 7`
    Edid {
        /// Input number (1-4)
        input: u8,
        /// EDID index (0-16)
        index: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "ez-matrix-bridge failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load(path).await?,
        None => BridgeConfig::default(),
    };
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(host) = args.mqtt_host {
        config.mqtt.host = host;
    }
    config.validate()?;

    match args.command.unwrap_or(Cmd::Run) {
        Cmd::Run => run_bridge(&config).await,
        Cmd::Status => print_status(&config).await,
        Cmd::Switch { output, option } => {
            let output = OutputPort::new(output)?;
            let select = OutputSelect::new(one_shot_context(&config).await?, output);
            let outcome = select.select_option(&option).await?;
            report(&outcome, select.current_option().map_or("Unknown", |s| s.label()));
            select.context().sync().shutdown();
            Ok(())
        }
        Cmd::Edid { input, index } => {
            let input = InputPort::new(input)?;
            let select = EdidSelect::new(one_shot_context(&config).await?, input);
            let outcome = select.select_option(&index).await?;
            report(&outcome, &select.current_option());
            select.context().sync().shutdown();
            Ok(())
        }
    }
}

async fn run_bridge(config: &BridgeConfig) -> Result<()> {
    let broker = config.mqtt.connect().await?;
    let entry = config.config_entry();
    let matrix = MatrixIntegration::setup(&entry, &broker).await?;
    tracing::info!(entry_id = entry.entry_id(), "EZ Matrix bridge running");

    log_entities(&matrix);

    let mut updates = matrix.sync().subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                log_entities(&matrix);
            }
            () = &mut shutdown => break,
        }
    }

    matrix.unload().await;
    broker.disconnect().await?;
    tracing::info!("EZ Matrix bridge stopped");
    Ok(())
}

async fn print_status(config: &BridgeConfig) -> Result<()> {
    let client = HttpConfig::new(&config.api_url).into_client()?;
    let snapshot = client.fetch_status().await?;
    let text = serde_json::to_string_pretty(snapshot.as_map()).map_err(ParseError::from)?;
    println!("{text}");
    Ok(())
}

async fn one_shot_context(config: &BridgeConfig) -> Result<EntityContext> {
    let client = HttpConfig::new(&config.api_url).into_client()?;
    let sync = StateSynchronizer::start(client.clone(), SyncConfig::default()).await?;
    Ok(EntityContext::new(config.config_entry().entry_id(), sync, client))
}

fn report(outcome: &CommandOutcome, current: &str) {
    match outcome {
        CommandOutcome::Accepted => println!("accepted, now: {current}"),
        CommandOutcome::Rejected { status } => {
            println!("rejected (HTTP {status}), still: {current}");
        }
        CommandOutcome::Failed(e) => println!("failed: {e}"),
    }
}

fn log_entities(matrix: &MatrixIntegration) {
    let state = matrix.sync().state();
    if !state.last_update_success() {
        tracing::warn!(error = state.last_error().unwrap_or_default(), "Device unavailable");
        return;
    }

    for sensor in matrix.sensors() {
        tracing::info!(
            entity = sensor.unique_id(),
            value = %sensor.state().unwrap_or_default(),
            "{}",
            sensor.name()
        );
    }
    for select in matrix.output_selects() {
        tracing::info!(
            entity = select.unique_id(),
            value = select.current_option().map_or("Unknown", |s| s.label()),
            "{}",
            select.name()
        );
    }
    for select in matrix.edid_selects() {
        tracing::info!(
            entity = select.unique_id(),
            value = %select.current_option(),
            "{}",
            select.name()
        );
    }
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
