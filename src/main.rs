//! LakshyaNav: decision loop for the Lakshya ball-collecting robot.
//!
//! Serves one car session over TCP: each inbound line is a sensor
//! observation as JSON, each outbound line a drive command. Observations
//! pass the admission gate, the decision engine produces a command, the
//! dispatcher publishes it and records it in the command history.

use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use lakshya_nav::command::{Goal, Mode};
use lakshya_nav::config::LakshyaConfig;
use lakshya_nav::dispatch::{Dispatcher, JsonLineSink};
use lakshya_nav::engine::{EngineConfig, NavigationEngine};
use lakshya_nav::error::Result;
use lakshya_nav::ingest::ObservationGate;
use lakshya_nav::perception::EmbeddedDetections;
use lakshya_nav::search::SearchStrategy;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lakshya_nav=info".parse().unwrap()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        LakshyaConfig::load(config_path)?
    } else if Path::new("lakshya.toml").exists() {
        info!("Loading configuration from lakshya.toml");
        LakshyaConfig::load(Path::new("lakshya.toml"))?
    } else {
        info!("Using default configuration");
        LakshyaConfig::default()
    };

    info!("LakshyaNav v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Run target: {} balls, mode {:?}",
        config.game.balls_required, config.game.mode
    );

    if config.game.mode == Mode::Manual {
        info!("Manual mode: decision engine disabled, nothing to serve");
        return Ok(());
    }

    let listener = TcpListener::bind(config.address())?;
    info!("Listening on {}", config.address());

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => match serve_session(stream, &config) {
                Ok(game_complete) => {
                    if game_complete {
                        info!("Run complete, shutting down");
                        break;
                    }
                }
                Err(e) => warn!("Session failed: {}", e),
            },
            Err(e) => warn!("Accept failed: {}", e),
        }
    }

    Ok(())
}

/// Serve one car session. Returns true if the run ended with GameEnd.
fn serve_session(stream: TcpStream, config: &LakshyaConfig) -> Result<bool> {
    let peer = stream.peer_addr()?;
    info!("Car connected from {}", peer);

    let reader = BufReader::new(stream.try_clone()?);
    let mut gate = ObservationGate::new(config.ingest.freshness_window_s);
    let mut engine = NavigationEngine::new(
        EngineConfig {
            balls_required: config.game.balls_required,
            camera: config.camera.clone(),
            ball: config.ball.clone(),
            home: config.home.clone(),
        },
        config.game.mode,
        EmbeddedDetections,
        SearchStrategy::new(config.search.clone(), config.game.random_seed),
    );
    let mut dispatcher = Dispatcher::new(JsonLineSink::new(stream));
    let mut game_complete = false;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let observation = match gate.admit_json(&line, now_ms()) {
            Ok(observation) => observation,
            Err(reason) => {
                warn!("Observation rejected: {}", reason);
                continue;
            }
        };

        let command = match engine.decide(&observation, dispatcher.history()) {
            Ok(command) => command,
            Err(e) => {
                warn!("Decision failed: {}", e);
                continue;
            }
        };

        let is_game_end = command.goal == Goal::GameEnd;
        dispatcher.dispatch(command, config.game.mode)?;

        if is_game_end {
            game_complete = true;
            break;
        }
    }

    info!(
        "Session closed: {} admitted, {} format rejects, {} stale rejects, {} publish failures",
        gate.admitted(),
        gate.rejected_format(),
        gate.rejected_stale(),
        dispatcher.publish_failures()
    );
    Ok(game_complete)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
