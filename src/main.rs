//! sangha-slam daemon entry point.
//!
//! Loads configuration, binds the UDP transport, spawns the backend thread,
//! and runs until SIGINT/SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release
//!
//! # With custom config file
//! cargo run --release -- --config sangha-slam.toml
//! ```

use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sangha_slam::threads::BackendThread;
use sangha_slam::{Config, MessageBus, UdpTransport};

struct Args {
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args { config_path: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("sangha-slam - distributed pose-graph back-end for robot fleets");
    println!();
    println!("USAGE:");
    println!("    sangha-slam [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (default: sangha-slam.toml)");
    println!("    -h, --help              Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    All settings are configured via the TOML config file:");
    println!("    - [fleet] nb_robots, robot_id: fleet membership");
    println!("    - [backend] process_period_ms, optimization_loop_period_ms,");
    println!("      max_waiting_time_sec: round timing");
    println!("    - [network] bind_addr, peers: UDP fabric");
}

fn load_config(args: &Args) -> Config {
    match &args.config_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match basic_toml::from_str(&contents) {
                Ok(cfg) => {
                    log::info!("Loaded config from {}", path);
                    cfg
                }
                Err(e) => {
                    log::warn!("Failed to parse config {}: {}", path, e);
                    Config::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read config {}: {}", path, e);
                Config::default()
            }
        },
        None => {
            for path in &["sangha-slam.toml", "/etc/sangha-slam.toml"] {
                if let Ok(contents) = fs::read_to_string(path) {
                    if let Ok(cfg) = basic_toml::from_str(&contents) {
                        log::info!("Loaded config from {}", path);
                        return cfg;
                    }
                }
            }
            Config::default()
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = load_config(&args);
    if let Err(e) = config.validate() {
        log::error!("invalid configuration: {e}");
        std::process::exit(1);
    }

    log::info!("sangha-slam starting");
    log::info!(
        "  Robot: {} of {} in fleet",
        config.fleet.robot_id,
        config.fleet.nb_robots
    );
    log::info!(
        "  Rounds: trigger every {}ms, loop every {}ms, timeout {}s",
        config.backend.process_period_ms,
        config.backend.optimization_loop_period_ms,
        config.backend.max_waiting_time_sec
    );
    log::info!(
        "  Network: {} with {} peers",
        config.network.bind_addr,
        config.network.peers.len()
    );

    let running = Arc::new(AtomicBool::new(true));

    let transport = match UdpTransport::bind(&config.network, Arc::clone(&running)) {
        Ok(transport) => transport,
        Err(e) => {
            log::error!("failed to bind {}: {e}", config.network.bind_addr);
            std::process::exit(1);
        }
    };
    let bus: Arc<dyn MessageBus> = transport;

    let backend = BackendThread::spawn(config, bus, Arc::clone(&running));

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&shutdown)) {
            log::warn!("failed to register signal handler: {e}");
        }
    }

    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(200));
    }

    log::info!("shutting down");
    running.store(false, Ordering::Relaxed);
    if backend.join().is_err() {
        log::error!("backend thread panicked");
    }
}
