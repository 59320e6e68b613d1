use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use longcut_core::tuning::PipelineTuning;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("RENDER_ENGINE must be 'dry-run' or 'ffmpeg', got '{0}'")]
    UnknownEngine(String),
}

/// Which render engine executes assembly plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Record plans and report their output paths without running ffmpeg.
    DryRun,
    Ffmpeg,
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dry-run" | "dryrun" => Ok(Self::DryRun),
            "ffmpeg" => Ok(Self::Ffmpeg),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Bearer token sent to the generation APIs.
    pub api_token: Option<String>,
    /// Text-to-image endpoint for models that need a seed frame.
    pub seed_image_endpoint: String,
    /// Root directory for rendered plan outputs.
    pub output_dir: PathBuf,
    pub engine: EngineKind,
    /// HTTP request timeout for backend calls.
    pub request_timeout: Duration,
    pub tuning: PipelineTuning,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                          |
    /// |-------------------------|----------------------------------|
    /// | `GENERATION_API_TOKEN`  | unset                            |
    /// | `SEED_IMAGE_ENDPOINT`   | `http://localhost:8189/images`   |
    /// | `OUTPUT_DIR`            | `./output`                       |
    /// | `RENDER_ENGINE`         | `dry-run`                        |
    /// | `REQUEST_TIMEOUT_SECS`  | `300`                            |
    /// | `BATCH_SIZE`            | `5`                              |
    /// | `INTER_BATCH_DELAY_MS`  | `2000`                           |
    /// | `MAX_RETRIES`           | `3`                              |
    /// | `CONTINUITY_THRESHOLD`  | `70`                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PipelineTuning::default();

        let api_token = lookup("GENERATION_API_TOKEN").filter(|t| !t.trim().is_empty());
        let seed_image_endpoint = lookup("SEED_IMAGE_ENDPOINT")
            .unwrap_or_else(|| "http://localhost:8189/images".into());
        let output_dir = lookup("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let engine = match lookup("RENDER_ENGINE") {
            Some(value) => value.parse()?,
            None => EngineKind::DryRun,
        };

        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", "u64", 300)?;

        let tuning = PipelineTuning {
            batch_size: parse_or(&lookup, "BATCH_SIZE", "usize", defaults.batch_size)?,
            inter_batch_delay_ms: parse_or(
                &lookup,
                "INTER_BATCH_DELAY_MS",
                "u64",
                defaults.inter_batch_delay_ms,
            )?,
            max_retries: parse_or(&lookup, "MAX_RETRIES", "u32", defaults.max_retries)?,
            continuity_threshold: parse_or(
                &lookup,
                "CONTINUITY_THRESHOLD",
                "number",
                defaults.continuity_threshold,
            )?,
            ..defaults
        };

        Ok(Self {
            api_token,
            seed_image_endpoint,
            output_dir,
            engine,
            request_timeout: Duration::from_secs(request_timeout_secs),
            tuning,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        None => Ok(default),
    }
}
