use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::debug;

use selectel_core::provider::ResourceType;
use selectel_provider::config::{Config, REGIONS};
use selectel_provider::resources::resource_types;

#[derive(Parser)]
#[command(name = "selectel")]
#[command(about = "Inspect the Selectel provider configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the provider configuration
    Validate {
        /// JSON provider block; the environment is used when omitted
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Print the resolved configuration as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the regions the provider accepts
    Regions,
    /// List supported resource types and their default timeouts
    Types,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config, json } => run_validate(config.as_deref(), json),
        Commands::Regions => {
            run_regions();
            Ok(())
        }
        Commands::Types => {
            run_types();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => {
            debug!("reading provider configuration from {}", path.display());
            let content = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            Config::from_json(&content).map_err(|e| e.to_string())
        }
        None => {
            debug!("reading provider configuration from the environment");
            Ok(Config::from_env())
        }
    }
}

fn run_validate(path: Option<&Path>, json: bool) -> Result<(), String> {
    let mut config = load_config(path)?;
    config.validate().map_err(|e| e.to_string())?;

    if json {
        let resolved = serde_json::json!({
            "auth_url": config.auth_url,
            "region": config.region,
            "project_id": config.project_id,
            "max_retries": config.max_retries,
        });
        let output = serde_json::to_string_pretty(&resolved)
            .map_err(|e| format!("Failed to serialize configuration: {}", e))?;
        println!("{}", output);
        return Ok(());
    }

    println!("{}", "Configuration is valid.".green().bold());
    println!("  {} {}", "endpoint:".bold(), config.auth_url);
    println!(
        "  {} {}",
        "region:".bold(),
        config.region.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  {} {}",
        "project:".bold(),
        config.project_id.as_deref().unwrap_or("(not set)")
    );
    if config.project_id.is_none() || config.region.is_none() {
        println!(
            "{}",
            "Set SEL_PROJECT_ID and SEL_REGION to import existing resources.".yellow()
        );
    }
    Ok(())
}

fn run_regions() {
    for region in REGIONS {
        println!("{}", region);
    }
}

fn run_types() {
    for resource_type in resource_types() {
        println!(
            "{}  {}",
            resource_type.name().cyan().bold(),
            describe_timeouts(resource_type.as_ref()).dimmed()
        );
    }
}

fn describe_timeouts(resource_type: &dyn ResourceType) -> String {
    let timeouts = resource_type.timeouts();
    format!(
        "create {}m, update {}m, delete {}m",
        timeouts.create.as_secs() / 60,
        timeouts.update.as_secs() / 60,
        timeouts.delete.as_secs() / 60
    )
}
