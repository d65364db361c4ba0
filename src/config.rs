use crate::error::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BufferConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub policy: Option<String>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: default_capacity(), policy: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "loop")]
    pub loop_: Option<bool>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { path: None, loop_: None, chunk_size: default_chunk_size() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_drain_size")]
    pub drain_size: usize,
    #[serde(default)]
    pub interval_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: None, drain_size: default_drain_size(), interval_ms: 0 }
    }
}

fn default_capacity() -> usize {
    4096
}

fn default_chunk_size() -> usize {
    512
}

fn default_drain_size() -> usize {
    256
}

/// What to do with incoming bytes when the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the oldest buffered bytes.
    #[default]
    Overwrite,
    /// Keep the buffered bytes and drop what does not fit.
    Reject,
}

impl OverflowPolicy {
    pub fn parse(s: &str) -> Result<Self, Error> {
        if s.eq_ignore_ascii_case("overwrite") {
            Ok(OverflowPolicy::Overwrite)
        } else if s.eq_ignore_ascii_case("reject") {
            Ok(OverflowPolicy::Reject)
        } else {
            Err(Error::Config(format!("Unknown overflow policy '{}'. Use overwrite or reject", s)))
        }
    }
}

impl Config {
    pub fn policy(&self) -> Result<OverflowPolicy, Error> {
        self.buffer.policy.as_deref().map_or(Ok(OverflowPolicy::default()), OverflowPolicy::parse)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.buffer.capacity == 0 {
            return Err(Error::Config("buffer.capacity must be greater than zero".into()));
        }
        if self.input.chunk_size == 0 {
            return Err(Error::Config("input.chunk_size must be greater than zero".into()));
        }
        if self.output.drain_size == 0 {
            return Err(Error::Config("output.drain_size must be greater than zero".into()));
        }
        self.policy()?;
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<Config, Error> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))
}

pub fn load_config(path: &str) -> Result<Config, Error> {
    if !Path::new(path).exists() {
        return Err(Error::Config(format!("Config file not found: {}", path)));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path, e)))?;

    let cfg = parse_config(&content)?;
    log::info!("Config loaded from: {}", path);
    log::info!(
        "Buffer of {} bytes, policy {:?}",
        cfg.buffer.capacity,
        cfg.buffer.policy.as_deref().unwrap_or("overwrite")
    );

    if cfg.input.chunk_size > cfg.buffer.capacity {
        log::warn!("input.chunk_size exceeds buffer.capacity - every read will overflow the buffer");
    }

    Ok(cfg)
}
