//! Server configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file using
//! the `GRID_WIDTH`, `GRID_HEIGHT`, `GRID_SIZE` and `GAME_SPEED` keys, then
//! command-line flags (and `PORT` from the environment).

use crate::game::SimulationSettings;
use crate::grid::Grid;
use clap::Parser;
use serde::Deserialize;
use shared::{
    DEFAULT_CELL_SIZE, DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH, DEFAULT_PORT, DEFAULT_TICK_MS,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Grid coordinates are `i32`, so neither side may exceed `i32::MAX` cells.
pub const MAX_GRID_DIMENSION: u32 = i32::MAX as u32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u32 },
}

/// Command-line arguments of the server binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// JSON config file with GRID_WIDTH, GRID_HEIGHT, GRID_SIZE and GAME_SPEED
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Grid width in cells
    #[arg(long)]
    pub grid_width: Option<u32>,

    /// Grid height in cells
    #[arg(long)]
    pub grid_height: Option<u32>,

    /// Display size of one cell, forwarded to clients
    #[arg(long)]
    pub cell_size: Option<u32>,

    /// Milliseconds between simulation ticks
    #[arg(short, long)]
    pub tick_ms: Option<u64>,

    /// Maximum number of concurrent sessions
    #[arg(short, long, default_value_t = 32)]
    pub max_sessions: usize,

    /// Seconds of silence before a session is dropped
    #[arg(long, default_value_t = 5)]
    pub session_timeout: u64,

    /// Seed for food and spawn placement; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Keys accepted in the JSON config file. All of them are optional.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(rename = "GRID_WIDTH")]
    pub grid_width: Option<u32>,
    #[serde(rename = "GRID_HEIGHT")]
    pub grid_height: Option<u32>,
    #[serde(rename = "GRID_SIZE")]
    pub cell_size: Option<u32>,
    #[serde(rename = "GAME_SPEED")]
    pub tick_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub grid_width: u32,
    pub grid_height: u32,
    pub cell_size: u32,
    pub tick_interval: Duration,
    pub max_sessions: usize,
    pub session_timeout: Duration,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            cell_size: DEFAULT_CELL_SIZE,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            max_sessions: 32,
            session_timeout: Duration::from_secs(5),
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Reads the config file named by `args`, if any, and layers the flags on top.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    pub fn resolve(args: &CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            host: args.host.clone(),
            port: args.port,
            grid_width: args
                .grid_width
                .or(file.grid_width)
                .unwrap_or(defaults.grid_width),
            grid_height: args
                .grid_height
                .or(file.grid_height)
                .unwrap_or(defaults.grid_height),
            cell_size: args
                .cell_size
                .or(file.cell_size)
                .unwrap_or(defaults.cell_size),
            tick_interval: args
                .tick_ms
                .or(file.tick_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            max_sessions: args.max_sessions,
            session_timeout: Duration::from_secs(args.session_timeout),
            seed: args.seed,
        };

        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.grid_width == 0 {
            return Err(ConfigError::Zero("grid width"));
        }
        if self.grid_height == 0 {
            return Err(ConfigError::Zero("grid height"));
        }
        if self.grid_width > MAX_GRID_DIMENSION {
            return Err(ConfigError::TooLarge {
                field: "grid width",
                max: MAX_GRID_DIMENSION,
            });
        }
        if self.grid_height > MAX_GRID_DIMENSION {
            return Err(ConfigError::TooLarge {
                field: "grid height",
                max: MAX_GRID_DIMENSION,
            });
        }
        if self.cell_size == 0 {
            return Err(ConfigError::Zero("cell size"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Zero("tick interval"));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::Zero("max sessions"));
        }
        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn simulation(&self) -> SimulationSettings {
        SimulationSettings {
            grid: Grid::new(self.grid_width, self.grid_height),
            cell_size: self.cell_size,
            seed: self.seed,
        }
    }
}
