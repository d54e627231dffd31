//! AirTag MQTT bridge - main entry point

use airtag_mqtt_bridge::bridge::{plan_cycle, Supervisor};
use airtag_mqtt_bridge::observability::{init_default_logging, HealthServer, HealthState};
use airtag_mqtt_bridge::protocol::TopicBuilder;
use airtag_mqtt_bridge::source::read_devices;
use airtag_mqtt_bridge::{BridgeConfig, MqttConnector};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

/// Publish Find My device locations to MQTT with Home Assistant discovery
#[derive(Parser)]
#[command(name = "airtag-mqtt-bridge")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge (default)
    Run,
    /// Validate configuration
    Config {
        /// Print the configuration with the password masked
        #[arg(long)]
        show: bool,
    },
    /// Read the device cache once and print what would be published
    Preview,
}

/// Rewrite single-dash long flags (`-config x`, `-config=x`, `-debug`) to
/// their `--` form; existing launch scripts use that spelling.
fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    let mut normalized = Vec::new();
    let mut passthrough = false;

    for arg in args {
        if passthrough || arg == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        match arg.split_once('=') {
            Some(("-config", value)) => normalized.push(format!("--config={value}")),
            Some(("-debug", value)) => {
                if value.parse::<bool>().unwrap_or(false) {
                    normalized.push("--debug".to_string());
                }
            }
            _ if arg == "-config" || arg == "-debug" => normalized.push(format!("-{arg}")),
            _ => normalized.push(arg),
        }
    }

    normalized
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_from(normalize_args(std::env::args()));

    let config = match BridgeConfig::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_default_logging(cli.debug);
            error!(path = %cli.config.display(), "Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    init_default_logging(cli.debug || config.debug);
    info!(
        "Starting airtag-mqtt-bridge v{} with {}",
        env!("CARGO_PKG_VERSION"),
        cli.config.display()
    );

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bridge(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
        Commands::Preview => preview(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_bridge(config: BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let health = HealthState::new();

    if let Some(addr) = config.healthcheck_addr() {
        let server = HealthServer::new(health.clone(), addr);
        tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("Health server error: {}", e);
            }
        });
    }

    let supervisor = Supervisor::new(MqttConnector, Arc::new(config), health);
    match supervisor.run().await {}
}

fn handle_config_command(
    config: &BridgeConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", serde_yaml::to_string(&config.redacted())?);
    }

    info!("Configuration validation complete");
    Ok(())
}

fn preview(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = config
        .source_path()
        .ok_or("no device cache path configured")?;
    let records = read_devices(&source)?;
    let plan = plan_cycle(&records, &TopicBuilder::new(config.topic_prefix()), config)?;

    for messages in &plan {
        println!(
            "{} (retain) {}",
            messages.config_topic,
            String::from_utf8_lossy(&messages.config_payload)
        );
        println!("{} (retain) {}", messages.state_topic, messages.state);
        if let Some(payload) = &messages.attributes_payload {
            println!(
                "{} (retain) {}",
                messages.attributes_topic,
                String::from_utf8_lossy(payload)
            );
        }
    }

    info!(devices = plan.len(), source = %source.display(), "Preview complete");
    Ok(())
}
