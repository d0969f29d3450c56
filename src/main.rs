//! Binary entrypoint for the nusterm CLI.
//!
//! Invocations:
//! - `nusterm` - list paired Bluetooth devices and exit
//! - `nusterm --robot-name` - interactive session with the configured
//!   default robot ("BBC micro:bit")
//! - `nusterm --robot-name="<name>"` - interactive session with that device
//!
//! Connection-establishment failures exit non-zero with a distinct message
//! and code per class; see `nusterm::errors`.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;

use nusterm::ble::bluez::BluezHost;
use nusterm::config::Config;
use nusterm::directory;
use nusterm::errors::ClientError;
use nusterm::session::Session;
use nusterm::terminal;

#[derive(Parser)]
#[command(name = "nusterm")]
#[command(about = "Terminal client for UART-over-BLE peripherals")]
#[command(version)]
struct Cli {
    /// Paired name of the robot to connect to. With the flag but no value,
    /// the configured default name is used; without the flag, paired
    /// devices are listed instead.
    #[arg(long, value_name = "NAME")]
    robot_name: Option<Option<String>>,

    /// Configuration file path
    #[arg(short, long, default_value = "nusterm.toml")]
    config: String,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config).await?;
    init_logging(&config, cli.verbose);

    let host = match BluezHost::new().await {
        Ok(host) => host,
        Err(e) => fail(ClientError::DirectoryUnavailable(e.to_string())),
    };

    match cli.robot_name {
        None => list_devices(&host).await,
        Some(given) => {
            let name = given.unwrap_or_else(|| config.connection.default_name.clone());
            run_session(&host, &name, config.connect_timeout()).await
        }
    }
}

/// Listing mode: one line per paired device, name plus address.
async fn list_devices(host: &BluezHost) -> Result<()> {
    let devices = match directory::list_paired(host).await {
        Ok(devices) => devices,
        Err(e) => fail(e),
    };
    if devices.is_empty() {
        println!("No paired Bluetooth devices.");
        return Ok(());
    }
    println!("Paired devices:");
    for device in &devices {
        println!(" - {} [{}]", device.name, device.address);
    }
    Ok(())
}

async fn run_session(host: &BluezHost, name: &str, timeout: Duration) -> Result<()> {
    info!("starting nusterm v{}", env!("CARGO_PKG_VERSION"));
    println!("Connecting to '{}'...", name);
    let session = match Session::connect(host, name, timeout).await {
        Ok(session) => session,
        Err(e) => fail(e),
    };
    terminal::run(session).await;
    Ok(())
}

/// Print the failure and exit with its class-specific status.
fn fail(err: ClientError) -> ! {
    eprintln!("{}", err);
    std::process::exit(err.exit_code());
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;

    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured base level. The quiet default
    // keeps log lines from interleaving with robot traffic on the display.
    let base_level = match verbosity {
        0 => config
            .logging
            .level
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or(log::LevelFilter::Warn),
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    if let Some(ref file) = config.logging.file {
        match std::fs::OpenOptions::new().create(true).append(true).open(file) {
            Ok(f) => {
                builder.target(env_logger::Target::Pipe(Box::new(f)));
            }
            Err(e) => eprintln!("cannot open log file {}: {}", file, e),
        }
    }

    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
