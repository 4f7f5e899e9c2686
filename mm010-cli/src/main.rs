use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use mm010_core::{
    Baud, Diagnostics, DispenseResult, Dispenser, DispenserConfig, Error, ParameterItem, Result,
};
use mm010_hal_serialport::NativePort;

/// Drive an MM010 note dispenser over a serial line
#[derive(Parser, Debug)]
#[command(name = "mm010", version, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device path, overrides the configuration file
    #[arg(short, long)]
    port: Option<String>,

    /// Line speed: 1200, 2400, 4800 or 9600
    #[arg(short, long)]
    baud: Option<u32>,

    /// Log every frame at info level
    #[arg(long, default_value_t = false)]
    traffic: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sensor flags and double detect averages
    Status,
    /// Clear the note path into the reject vault
    Purge,
    /// Dispense notes to the exit
    Dispense { count: u8 },
    /// Dispense notes into the reject vault
    TestDispense { count: u8 },
    Reset,
    /// Result of the previous dispense
    LastStatus,
    ConfigStatus,
    DoubleDetectDiagnostics,
    SensorDiagnostics,
    SingleNoteDispense,
    SingleNoteEject,
    /// Read a device parameter
    ReadParam { item: u16 },
    /// Write a device parameter
    WriteParam { item: u16, value: String },
    TestMode,
    /// Print the effective configuration as TOML and exit
    ShowConfig,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    let config = resolve_config(&args)?;
    if let Command::ShowConfig = args.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let dispenser = Dispenser::<NativePort>::open(config)?;
    debug!(
        "Waiting up to {:?} for each reply step",
        dispenser.config().retry_policy().ceiling()
    );

    let result = run(&dispenser, &args.command);
    if let Err(e) = &result {
        error!("{:?} failed: {}", args.command, e);
        let state = dispenser.last_cycle_state();
        if state.is_failed() {
            debug!("Cycle ended in {:?}", state);
        }
        if let Some(hint) = failure_hint(e) {
            warn!("{hint}");
        }
    }
    dispenser.close()?;
    result?;
    Ok(())
}

fn resolve_config(args: &Args) -> Result<DispenserConfig> {
    let mut config = match (&args.config, &args.port) {
        (Some(path), _) => {
            info!("Loading configuration from {}", path.display());
            DispenserConfig::load(path)?
        }
        (None, Some(port)) => DispenserConfig::new(port.clone(), Baud::default()),
        (None, None) => {
            return Err(Error::Config("either --config or --port is required".into()));
        }
    };

    if let (Some(_), Some(port)) = (&args.config, &args.port) {
        config.port = port.clone();
    }
    if let Some(rate) = args.baud {
        config.baud = Baud::try_from(rate).map_err(Error::Config)?;
    }
    if args.traffic {
        config.logging = true;
    }

    config.validate()?;
    Ok(config)
}

/// Advice for errors that leave the link in an unknown position
fn failure_hint(err: &Error) -> Option<&'static str> {
    if err.is_desync() {
        Some("link may be out of step; reset the dispenser before the next command")
    } else if matches!(err, Error::RetryExhausted { .. }) {
        Some("no reply; check the cable, port and baud rate")
    } else {
        None
    }
}

fn parameter_item(item: u16) -> Result<ParameterItem> {
    ParameterItem::new(item).ok_or(Error::InvalidArgument("parameter item must be 0-999"))
}

fn run(dispenser: &Dispenser<NativePort>, command: &Command) -> Result<()> {
    match command {
        Command::Status => {
            let status = dispenser.status()?;
            println!("feed sensor blocked:      {}", status.feed_sensor_blocked);
            println!("exit sensor blocked:      {}", status.exit_sensor_blocked);
            println!("reset since last status:  {}", status.reset_since_last_status);
            println!("timing wheel blocked:     {}", status.timing_wheel_sensor_blocked);
            println!("calibrating double detect: {}", status.calibrating_double_detect);
            println!("average thickness:        {}", status.average_thickness);
            println!("average length:           {}", status.average_length);
        }
        Command::Purge => {
            let result = dispenser.purge()?;
            println!("{:?}, purged {}", result.code, result.purged);
        }
        Command::Dispense { count } => print_dispense(&dispenser.dispense(*count)?),
        Command::TestDispense { count } => print_dispense(&dispenser.test_dispense(*count)?),
        Command::Reset => println!("{:?}", dispenser.reset()?),
        Command::LastStatus => print_dispense(&dispenser.last_status()?),
        Command::ConfigStatus => print_diagnostics(&dispenser.configuration_status()?),
        Command::DoubleDetectDiagnostics => {
            print_diagnostics(&dispenser.double_detect_diagnostics()?)
        }
        Command::SensorDiagnostics => print_diagnostics(&dispenser.sensor_diagnostics()?),
        Command::SingleNoteDispense => {
            let result = dispenser.single_note_dispense()?;
            println!("{:?}, dispensed {}", result.code, result.dispensed);
        }
        Command::SingleNoteEject => println!("{:?}", dispenser.single_note_eject()?),
        Command::ReadParam { item } => {
            println!("{}", dispenser.read_parameter(parameter_item(*item)?)?);
        }
        Command::WriteParam { item, value } => {
            dispenser.write_parameter(parameter_item(*item)?, value)?;
            println!("ok");
        }
        Command::TestMode => println!("{:?}", dispenser.test_mode()?),
        Command::ShowConfig => {}
    }
    Ok(())
}

fn print_dispense(result: &DispenseResult) {
    println!(
        "{:?}, dispensed {}, rejected {}",
        result.code, result.dispensed, result.rejected
    );
}

fn print_diagnostics(diag: &Diagnostics) {
    let values: Vec<String> = diag.values.iter().map(u8::to_string).collect();
    println!("{:?}: [{}]", diag.code, values.join(", "));
}
