//! lcli: command-line control for Logitech Litra Glow and Litra Beam lights.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use litra_core::command::PowerState;
use litra_core::config::OsFileSystem;
use litra_core::control::{Applied, Controller, ControllerOptions};
use litra_core::device::{list_devices, DiscoveryOptions};
use litra_core::dispatch::Delivery;
use litra_core::profile::{ProfileState, ProfileStore};
use litra_core::safety;
use litra_core::transport::{HidApiBackend, HidBackend};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "lcli",
    version,
    about = "Control Logitech Litra Glow and Litra Beam lights"
)]
struct Cli {
    /// Light index as shown by `lcli devices`; 0 addresses every light.
    #[arg(short, long, global = true, default_value_t = 0)]
    device: usize,
    /// State file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Do not record state when no light accepted the command.
    #[arg(long, global = true)]
    require_delivery: bool,
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch the light on.
    On,
    /// Switch the light off.
    Off,
    /// Switch the light on or off based on its stored state.
    Toggle,
    /// Set brightness (0-100 percent).
    Bright {
        level: u32,
    },
    /// Raise brightness by a step (0-100), stopping at 100.
    Brightup {
        step: u32,
    },
    /// Lower brightness by a step (0-100), stopping at 0.
    Brightdown {
        step: u32,
    },
    /// Set color temperature (2700-6500 K).
    Temp {
        kelvin: u32,
    },
    /// Raise color temperature by a step in kelvin, stopping at 6500 K.
    Tempup {
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        step: u16,
    },
    /// Lower color temperature by a step in kelvin, stopping at 2700 K.
    Tempdown {
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        step: u16,
    },
    /// List connected lights with their indices.
    Devices {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Show the stored state of the selected light.
    State {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Manage named presets.
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// List preset names.
    List,
    /// Show the fields of a preset.
    Show {
        name: String,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Create or update a preset from explicit values.
    Save {
        name: String,
        #[arg(long)]
        brightness: Option<u32>,
        #[arg(long)]
        temperature: Option<u32>,
        #[arg(long, value_enum)]
        power: Option<PowerArg>,
    },
    /// Save the stored state of the selected light as a preset.
    SaveCurrent {
        name: String,
    },
    /// Send a preset to the selected light.
    Apply {
        name: String,
    },
    /// Delete a preset.
    Delete {
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PowerArg {
    On,
    Off,
}

impl From<PowerArg> for PowerState {
    fn from(arg: PowerArg) -> Self {
        match arg {
            PowerArg::On => PowerState::On,
            PowerArg::Off => PowerState::Off,
        }
    }
}

fn open_store(config: Option<&Path>) -> Result<ProfileStore> {
    let store = match config {
        Some(path) => ProfileStore::with_path(Box::new(OsFileSystem), path),
        None => ProfileStore::open(Box::new(OsFileSystem))?,
    };
    debug!(path = %store.path().display(), "Using state file");
    Ok(store)
}

fn discovery_options(cli: &Cli) -> DiscoveryOptions {
    DiscoveryOptions {
        log_devices: cli.verbose,
    }
}

fn open_controller(
    cli: &Cli,
    open_backend: impl FnOnce() -> Result<Box<dyn HidBackend>>,
    open_store: impl FnOnce() -> Result<ProfileStore>,
) -> Result<Controller> {
    let store = open_store()?;
    let options = ControllerOptions {
        discovery: discovery_options(cli),
        require_delivery: cli.require_delivery,
    };
    Ok(Controller::new(open_backend()?, store, options))
}

fn describe(state: &ProfileState) -> String {
    let brightness = state
        .brightness
        .map_or_else(|| "unset".to_string(), |v| format!("{v}%"));
    let temperature = state
        .temperature
        .map_or_else(|| "unset".to_string(), |v| format!("{v} K"));
    let power = state
        .power
        .map_or_else(|| "unset".to_string(), |p| p.to_string());
    format!("brightness: {brightness}, temperature: {temperature}, power: {power}")
}

fn target(device: usize) -> String {
    if device == 0 {
        "all lights".to_string()
    } else {
        format!("light {device}")
    }
}

/// Print the outcome of one dispatched command.
fn report(applied: &Applied) {
    let report = &applied.report;
    for outcome in report.failures() {
        let reason = match &outcome.delivery {
            Delivery::WriteFailed(e) | Delivery::OpenFailed(e) => e.as_str(),
            _ => continue,
        };
        eprintln!(
            "warning: {} {} ({}): {reason}",
            outcome.device.name, outcome.device.index, outcome.device.serial
        );
    }
    if report.discovered() == 0 {
        eprintln!("warning: no Litra lights found");
    } else if !report.target_found() {
        eprintln!("warning: no light with index {}", report.target);
    } else if report.delivered() == 0 {
        eprintln!("warning: no light accepted the command");
    }
    if !applied.recorded {
        eprintln!("State not recorded.");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    run(
        &cli,
        || Ok(Box::new(HidApiBackend::new()?) as Box<dyn HidBackend>),
        || open_store(cli.config.as_deref()),
    )
}

/// Execute one command. The HID backend and the state file are opened only
/// by the commands that use them.
fn run(
    cli: &Cli,
    open_backend: impl FnOnce() -> Result<Box<dyn HidBackend>>,
    open_store: impl FnOnce() -> Result<ProfileStore>,
) -> Result<()> {
    let device = cli.device;

    match &cli.command {
        Commands::On => {
            let applied = open_controller(cli, open_backend, open_store)?.power_on(device)?;
            report(&applied);
            println!("Turned on {}", target(device));
        }
        Commands::Off => {
            let applied = open_controller(cli, open_backend, open_store)?.power_off(device)?;
            report(&applied);
            println!("Turned off {}", target(device));
        }
        Commands::Toggle => {
            let applied = open_controller(cli, open_backend, open_store)?.toggle(device)?;
            report(&applied);
            println!("{} on {}", applied.command, target(device));
        }
        Commands::Bright { level } => {
            let level = safety::validate_brightness(*level)?;
            let applied =
                open_controller(cli, open_backend, open_store)?.set_brightness(device, level)?;
            report(&applied);
            println!("Brightness set to {level}% on {}", target(device));
        }
        Commands::Brightup { step } | Commands::Brightdown { step } => {
            let step = safety::validate_brightness_delta(*step)?;
            let mut controller = open_controller(cli, open_backend, open_store)?;
            let applied = if matches!(cli.command, Commands::Brightup { .. }) {
                controller.bright_up(device, step)?
            } else {
                controller.bright_down(device, step)?
            };
            report(&applied);
            println!("{} on {}", applied.command, target(device));
        }
        Commands::Temp { kelvin } => {
            let kelvin = safety::validate_temperature(*kelvin)?;
            let applied =
                open_controller(cli, open_backend, open_store)?.set_temperature(device, kelvin)?;
            report(&applied);
            println!("Temperature set to {kelvin} K on {}", target(device));
        }
        Commands::Tempup { step } | Commands::Tempdown { step } => {
            let mut controller = open_controller(cli, open_backend, open_store)?;
            let applied = if matches!(cli.command, Commands::Tempup { .. }) {
                controller.temp_up(device, *step)?
            } else {
                controller.temp_down(device, *step)?
            };
            report(&applied);
            println!("{} on {}", applied.command, target(device));
        }
        Commands::Devices { json } => {
            let mut backend = open_backend()?;
            let devices = list_devices(backend.as_mut(), &discovery_options(cli));
            if *json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else if devices.is_empty() {
                println!("No Litra lights found.");
                println!("Ensure the light is connected and udev rules allow access.");
            } else {
                for dev in &devices {
                    println!(
                        "{}: {} (serial: {}, PID: 0x{:04X})",
                        dev.index, dev.name, dev.serial, dev.product_id
                    );
                }
            }
        }
        Commands::State { json } => {
            let state = open_store()?.read_state(device)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("{}: {}", target(device), describe(&state));
            }
        }
        Commands::Profile { action } => run_profile(cli, action, open_backend, open_store)?,
    }

    Ok(())
}

fn run_profile(
    cli: &Cli,
    action: &ProfileCommand,
    open_backend: impl FnOnce() -> Result<Box<dyn HidBackend>>,
    open_store: impl FnOnce() -> Result<ProfileStore>,
) -> Result<()> {
    match action {
        ProfileCommand::List => {
            for name in open_store()?.profile_names()? {
                println!("{name}");
            }
        }
        ProfileCommand::Show { name, json } => {
            let store = open_store()?;
            if !store.profile_names()?.iter().any(|n| n == name) {
                bail!("no such profile: {name}");
            }
            let state = store.read_profile(name)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("{name}: {}", describe(&state));
            }
        }
        ProfileCommand::Save {
            name,
            brightness,
            temperature,
            power,
        } => {
            let name = safety::validate_profile_name(name)?;
            let mut state = ProfileState::new();
            if let Some(level) = brightness {
                state = state.with_brightness(safety::validate_brightness(*level)?);
            }
            if let Some(kelvin) = temperature {
                state = state.with_temperature(safety::validate_temperature(*kelvin)?);
            }
            if let Some(power) = power {
                state = state.with_power((*power).into());
            }
            if state.is_empty() {
                bail!("nothing to save: pass --brightness, --temperature, or --power");
            }
            open_store()?.add_or_update_profile(name, &state)?;
            println!("Saved profile '{name}' ({})", describe(&state));
        }
        ProfileCommand::SaveCurrent { name } => {
            let name = safety::validate_profile_name(name)?;
            let state = open_store()?.save_state_as_profile(name, cli.device)?;
            println!("Saved profile '{name}' ({})", describe(&state));
        }
        ProfileCommand::Apply { name } => {
            let applied =
                open_controller(cli, open_backend, open_store)?.apply_profile(name, cli.device)?;
            for step in &applied {
                report(step);
            }
            println!("Applied profile '{name}' to {}", target(cli.device));
        }
        ProfileCommand::Delete { name } => {
            open_store()?.delete_profile(name)?;
            println!("Deleted profile '{name}'");
        }
    }
    Ok(())
}
