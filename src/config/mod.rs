//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "brezza";

const DEFAULT_TRACKING_ENDPOINT: &str = "http://127.0.0.1:3000/api/tracking";
const DEFAULT_SEARCH_INDEX_URL: &str = "http://127.0.0.1:3000/search-index.json";
const DEFAULT_FLUSH_DELAY_MS: u64 = 100;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_SECS: u64 = 1;
const DEFAULT_PREFETCH_DELAY_SECS: u64 = 2;
const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_CONTENT_PREFIX: &str = "posts";
const DEFAULT_INDEX_OUTPUT: &str = "public/search-index.json";

/// Command-line arguments for the brezza-index binary.
#[derive(Debug, Parser)]
#[command(name = "brezza-index", version, about = "Brezza search index builder")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BREZZA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: BuildOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BuildOverrides {
    /// Override the content root directory.
    #[arg(long = "content-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub content_dir: Option<PathBuf>,

    /// Override the content key prefix to index.
    #[arg(long = "prefix", value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Override the search index output path.
    #[arg(long = "output", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub tracking: TrackingSettings,
    pub search: SearchSettings,
    pub content: ContentSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct TrackingSettings {
    /// Tracking endpoint accepting event POSTs.
    pub endpoint: Url,
    /// Flush coalescing window.
    pub flush_delay: Duration,
    /// Total delivery attempts per event.
    pub max_retries: u32,
    /// Wait before the second attempt; doubles per further attempt.
    pub backoff_base: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// URL of the search index asset.
    pub index_url: Url,
    /// Idle window before the deferred index fetch.
    pub prefetch_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    /// Content root directory.
    pub dir: PathBuf,
    /// Key prefix of indexable content.
    pub prefix: String,
    /// Output path of the built index asset.
    pub output: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("BREZZA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_build_overrides(&cli.overrides);
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    tracking: RawTrackingSettings,
    search: RawSearchSettings,
    content: RawContentSettings,
}

impl RawSettings {
    fn apply_build_overrides(&mut self, overrides: &BuildOverrides) {
        if let Some(dir) = overrides.content_dir.as_ref() {
            self.content.dir = Some(dir.clone());
        }
        if let Some(prefix) = overrides.prefix.as_ref() {
            self.content.prefix = Some(prefix.clone());
        }
        if let Some(output) = overrides.output.as_ref() {
            self.content.output = Some(output.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTrackingSettings {
    endpoint: Option<String>,
    flush_delay_ms: Option<u64>,
    max_retries: Option<u32>,
    backoff_base_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    index_url: Option<String>,
    prefetch_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    dir: Option<PathBuf>,
    prefix: Option<String>,
    output: Option<PathBuf>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            logging: build_logging_settings(raw.logging)?,
            tracking: build_tracking_settings(raw.tracking)?,
            search: build_search_settings(raw.search)?,
            content: ContentSettings {
                dir: raw
                    .content
                    .dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR)),
                prefix: raw
                    .content
                    .prefix
                    .unwrap_or_else(|| DEFAULT_CONTENT_PREFIX.to_string()),
                output: raw
                    .content
                    .output
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_OUTPUT)),
            },
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(raw) => LevelFilter::from_str(&raw)
            .map_err(|err| LoadError::invalid("logging.level", err.to_string()))?,
        None => LevelFilter::INFO,
    };
    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    Ok(LoggingSettings { level, format })
}

fn build_tracking_settings(tracking: RawTrackingSettings) -> Result<TrackingSettings, LoadError> {
    let endpoint = parse_url(
        "tracking.endpoint",
        tracking.endpoint.as_deref().unwrap_or(DEFAULT_TRACKING_ENDPOINT),
    )?;
    let max_retries = tracking.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
    if max_retries == 0 {
        return Err(LoadError::invalid(
            "tracking.max_retries",
            "must be at least 1",
        ));
    }
    Ok(TrackingSettings {
        endpoint,
        flush_delay: Duration::from_millis(
            tracking.flush_delay_ms.unwrap_or(DEFAULT_FLUSH_DELAY_MS),
        ),
        max_retries,
        backoff_base: Duration::from_secs(
            tracking.backoff_base_secs.unwrap_or(DEFAULT_BACKOFF_BASE_SECS),
        ),
    })
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    Ok(SearchSettings {
        index_url: parse_url(
            "search.index_url",
            search.index_url.as_deref().unwrap_or(DEFAULT_SEARCH_INDEX_URL),
        )?,
        prefetch_delay: Duration::from_secs(
            search.prefetch_delay_secs.unwrap_or(DEFAULT_PREFETCH_DELAY_SECS),
        ),
    })
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, LoadError> {
    Url::parse(raw).map_err(|err| LoadError::invalid(key, err.to_string()))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
