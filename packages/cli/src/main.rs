#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line front end for the safety core.
//!
//! ```text
//! sarthi zones [--state S] [--search Q] [--risk LEVEL] [--json]
//! sarthi check --lat 28.6 --lng 77.2 [--json]
//! sarthi simulate --waypoints "25,80;28.6,77.2" [--respond safe] [--respond-after 5]
//! ```
//!
//! Configuration is read from the file named by `SARTHI_CONFIG`; zones come
//! from the built-in fallback catalog unless `--zones` names a TOML file.

mod console;
mod simulate;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use sarthi_geofence::evaluate;
use sarthi_guard::GuardConfig;
use sarthi_zone::{ZoneFilter, all_fallback_zones, filter_zones, parse_zones};
use sarthi_zone_models::{Position, RiskLevel, RiskZone};

use crate::simulate::{Respond, Simulation};

#[derive(Parser)]
#[command(name = "sarthi", about = "Danger-zone geofencing and emergency escalation")]
struct Cli {
    /// TOML file with a `[[zones]]` list to use instead of the fallback catalog
    #[arg(long, global = true)]
    zones: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List risk zones, worst first
    Zones {
        /// Exact state name
        #[arg(long)]
        state: Option<String>,
        /// Substring of the state name
        #[arg(long)]
        search: Option<String>,
        /// Risk level (low, medium, high, critical)
        #[arg(long)]
        risk: Option<RiskLevel>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one position against the zones
    Check {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Walk through waypoints and follow any alert that opens
    Simulate {
        /// Semicolon-separated `lat,lng` pairs
        #[arg(long)]
        waypoints: String,
        /// Seconds between waypoints
        #[arg(long, default_value = "2")]
        interval_secs: u64,
        /// How the simulated user answers an alert
        #[arg(long, value_enum, default_value = "none")]
        respond: Respond,
        /// Seconds before answering
        #[arg(long, default_value = "5")]
        respond_after: u64,
        /// Print the session report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_zones(path: Option<&Path>) -> Result<Vec<RiskZone>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(all_fallback_zones());
    };
    let content = std::fs::read_to_string(path)?;
    let zones = parse_zones(&content)?;
    log::info!("Loaded {} zones from {}", zones.len(), path.display());
    Ok(zones)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = GuardConfig::from_env()?;
    let zones = load_zones(cli.zones.as_deref())?;

    match cli.command {
        Commands::Zones {
            state,
            search,
            risk,
            json,
        } => {
            let filter = ZoneFilter {
                state,
                search,
                risk_level: risk,
            };
            let listed = filter_zones(&zones, &filter);

            if json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
                return Ok(());
            }

            if listed.is_empty() {
                println!("No zones match.");
                return Ok(());
            }

            println!(
                "{:<20} {:<9} {:>8} {:>6} CENTER",
                "STATE", "RISK", "CRIMES", "YEAR"
            );
            println!("{}", "-".repeat(70));
            for zone in &listed {
                println!(
                    "{:<20} {:<9} {:>8} {:>6} {} (radius {:.0} km)",
                    zone.state,
                    zone.risk_level,
                    zone.total_crimes,
                    zone.year.map_or_else(|| "-".to_string(), |y| y.to_string()),
                    zone.center,
                    config.radii.radius_km(zone.risk_level)
                );
            }
            println!("\n{} zone(s)", listed.len());
        }
        Commands::Check { lat, lng, json } => {
            let position = Position::new(lat, lng)?;
            let status = evaluate(position, &zones, &config.radii);

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            match (&status.current_zone, status.distance_km) {
                (Some(zone), Some(distance_km)) => {
                    println!(
                        "{position}: inside {} ({}) zone, {distance_km:.1} km from center",
                        zone.state, zone.risk_level
                    );
                    if status.is_in_danger_zone {
                        println!("DANGER: an alert would open here");
                    }
                }
                _ => println!("{position}: outside all zones"),
            }
        }
        Commands::Simulate {
            waypoints,
            interval_secs,
            respond,
            respond_after,
            json,
        } => {
            let simulation = Simulation {
                waypoints: simulate::parse_waypoints(&waypoints)?,
                interval: Duration::from_secs(interval_secs),
                respond,
                respond_after: Duration::from_secs(respond_after),
            };

            let Some(report) = simulate::run(simulation, &config, zones).await else {
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Session {} ended: {} (check-in: {}, emergency contacted: {})",
                    report.session_id,
                    report.outcome,
                    report.check_in_status(),
                    report.emergency_contacted()
                );
            }
        }
    }

    Ok(())
}
