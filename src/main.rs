mod calibration;
mod config;
mod ephemeris;
mod predict;
mod rotator;
mod service;

use std::process::ExitCode;

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};

use crate::calibration::CalibrationModel;
use crate::config::{BackendChoice, Config};
use crate::ephemeris::{find_events, topocentric_at, TleEntry, TleSet};
use crate::predict::{build_passes, generate_look_plan, Pass, PassFailure, PredictError};
use crate::rotator::{MotionController, SimulatedBackend};
use crate::service::{run_service, CommandExecutor};

#[derive(Parser)]
#[command(name = "rotomat")]
#[command(about = "Satellite pass planning and antenna rotator control")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "rotomat.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List upcoming passes for the configured station
    Passes {
        /// Look-ahead window in hours
        #[arg(long, default_value_t = 4.0)]
        hours: f64,
        /// Only satellites whose name starts with this prefix
        #[arg(long)]
        sat_name: Option<String>,
        /// Only the satellite with this catalog number
        #[arg(long)]
        norad_id: Option<u32>,
        /// Print the look plan for the Nth listed pass (1-based)
        #[arg(long)]
        plan: Option<usize>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run the TCP rotator command service
    Serve,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading {}: {}", cli.config, e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Passes {
            hours,
            sat_name,
            norad_id,
            plan,
            json,
        } => passes(&config, hours, sat_name, norad_id, plan, json),
        Commands::Serve => serve(&config),
    }
}

fn passes(
    config: &Config,
    hours: f64,
    sat_name: Option<String>,
    norad_id: Option<u32>,
    plan: Option<usize>,
    json: bool,
) -> ExitCode {
    if !(0.0..=24.0).contains(&hours) {
        eprintln!("Look-ahead of {hours} hours is out of range (0 to 24)");
        return ExitCode::FAILURE;
    }
    let time_step = match config.time_step() {
        Ok(step) => step,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut tle_set = match TleSet::load_dir(&config.predict.tle_folder) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("Error loading TLEs: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(prefix) = sat_name.as_deref() {
        tle_set.retain_name_prefix(prefix);
    }
    if tle_set.is_empty() {
        log::warn!(
            "No satellites loaded from {}",
            config.predict.tle_folder.display()
        );
    }
    log::info!("Loaded {} satellites", tle_set.len());

    let station = config.ground_station();
    let t0 = Utc::now();
    let t1 = t0 + Duration::seconds((hours * 3600.0) as i64);

    let mut all_passes: Vec<(Pass, usize)> = Vec::new();
    let mut all_failures: Vec<PassFailure> = Vec::new();
    let entries: Vec<&TleEntry> = match norad_id {
        Some(id) => tle_set.by_norad_id(id).into_iter().collect(),
        None => tle_set.iter().collect(),
    };

    for (entry_ndx, entry) in entries.iter().enumerate() {
        let events = match find_events(
            &station,
            &entry.elements,
            &entry.constants,
            t0,
            t1,
            config.predict.min_elevation_deg,
        ) {
            Ok(events) => events,
            Err(e) => {
                log::warn!("Skipping {}: {}", entry.satellite.name, e);
                continue;
            }
        };
        let (passes, failures) = build_passes(&events, &entry.satellite);
        all_passes.extend(passes.into_iter().map(|p| (p, entry_ndx)));
        all_failures.extend(failures);
    }
    all_passes.sort_by_key(|(pass, _)| pass.ascend_time);

    for failure in &all_failures {
        log::warn!("Incomplete pass at {}: {}", failure.time, failure.reason);
    }

    if json {
        let passes: Vec<&Pass> = all_passes.iter().map(|(pass, _)| pass).collect();
        let doc = serde_json::json!({ "passes": passes, "failures": all_failures });
        println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
        return ExitCode::SUCCESS;
    }

    println!(
        "Upcoming passes over {} degrees for {}",
        config.predict.min_elevation_deg,
        config.station.name.as_deref().unwrap_or("station"),
    );
    for (ndx, (pass, _)) in all_passes.iter().enumerate() {
        println!("{} {}", ndx + 1, format_pass(pass));
    }
    if all_passes.is_empty() {
        println!("No passes found");
        return ExitCode::SUCCESS;
    }

    if let Some(plan_ndx) = plan {
        let Some((pass, entry_ndx)) = all_passes.get(plan_ndx.wrapping_sub(1)) else {
            eprintln!("No pass number {plan_ndx}");
            return ExitCode::FAILURE;
        };
        let entry = entries[*entry_ndx];
        let look_plan = generate_look_plan(
            pass,
            |t: DateTime<Utc>| {
                topocentric_at(&station, &entry.elements, &entry.constants, t)
                    .map_err(PredictError::from)
            },
            time_step,
        );
        match look_plan {
            Ok(look_plan) => {
                println!(
                    "Look plan for {} ({})",
                    look_plan.satellite.name, look_plan.satellite.norad_id
                );
                for sample in &look_plan.samples {
                    println!(
                        "{} Az = {:6.2} Elev = {:6.2}",
                        sample.time.format("%Y-%m-%d %H:%M:%S UTC"),
                        sample.az_deg,
                        sample.el_deg
                    );
                }
            }
            Err(e) => {
                eprintln!("Error generating look plan: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn format_pass(pass: &Pass) -> String {
    let line = |t: DateTime<Utc>, label: &str| {
        format!("\t{} {}\n", t.format("%Y-%m-%d %H:%M:%S UTC"), label)
    };
    format!(
        "{} {}\n{}{}{}",
        pass.satellite.norad_id,
        pass.satellite.name,
        line(pass.ascend_time, "Rise time"),
        line(pass.peak_time, "Peak time"),
        line(pass.descend_time, "Set time"),
    )
}

fn serve(config: &Config) -> ExitCode {
    let cal = match CalibrationModel::from_file(&config.rotator.cal_file) {
        Ok(cal) => cal,
        Err(e) => {
            eprintln!(
                "Error loading calibration {}: {}",
                config.rotator.cal_file.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let controller = match config.rotator.backend {
        BackendChoice::Simulated => {
            log::info!("Using the simulated rotator backend");
            let backend = SimulatedBackend::new(cal.clone());
            MotionController::new(backend, cal, config.rotator.max_seek_ticks)
        }
    };
    let executor = CommandExecutor::spawn(controller);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = runtime.block_on(run_service(&config.service.bind, executor)) {
        eprintln!("Service error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
