//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use leafscan_ai::PixelScale;
use leafscan_remote::DEFAULT_API_BASE;

#[derive(Parser, Debug)]
#[command(name = "leafscan")]
#[command(version)]
#[command(about = "Plant species and disease classification service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// List the remote models available to an API key
    Models(ModelsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "LEAFSCAN_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// ONNX classifier
    #[arg(long, env = "MODEL_PATH", default_value = "final_plant_code/model.onnx")]
    pub model: PathBuf,

    /// JSON array of species names, in model output order
    #[arg(
        long,
        env = "SPECIES_LABELS_PATH",
        default_value = "final_plant_code/species_labels.json"
    )]
    pub species_labels: PathBuf,

    /// JSON array of disease names, in model output order
    #[arg(
        long,
        env = "DISEASE_LABELS_PATH",
        default_value = "final_plant_code/disease_labels.json"
    )]
    pub disease_labels: PathBuf,

    /// Remote `generateContent` endpoint
    #[arg(long, env = "LLM_URL")]
    pub llm_url: Option<String>,

    /// Remote API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Combined confidence (percent) below which the remote model takes over
    #[arg(long, env = "AI_FALLBACK_THRESHOLD", default_value_t = 50.0)]
    pub fallback_threshold: f64,

    /// Allow the remote model to take over low-confidence predictions
    #[arg(
        long,
        env = "ENABLE_AI_TAKEOVER",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    pub ai_takeover: bool,

    /// Run local inference (the model is not loaded when disabled)
    #[arg(
        long,
        env = "ML_ENABLED",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    pub ml_enabled: bool,

    /// Lifetime usage counters
    #[arg(long, env = "STATS_FILE", default_value = "usage_stats.json")]
    pub stats_file: PathBuf,

    /// Seconds between usage checkpoints, 0 to save only at shutdown
    #[arg(long, env = "STATS_SAVE_SECS", default_value_t = 60)]
    pub stats_save_secs: u64,

    #[arg(long, env = "ANALYSIS_TIMEOUT_SECS", default_value_t = 20)]
    pub analysis_timeout_secs: u64,

    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value_t = 30)]
    pub chat_timeout_secs: u64,

    /// Largest accepted request body
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Classifier input resolution (square)
    #[arg(long, env = "IMAGE_SIZE", default_value_t = 224)]
    pub image_size: u32,

    /// Input pixel range the classifier was trained on
    #[arg(long, env = "PIXEL_SCALE", value_enum, default_value_t = ScaleArg::Raw)]
    pub pixel_scale: ScaleArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleArg {
    /// 0-255
    Raw,
    /// 0-1
    Unit,
}

impl From<ScaleArg> for PixelScale {
    fn from(s: ScaleArg) -> Self {
        match s {
            ScaleArg::Raw => PixelScale::Raw,
            ScaleArg::Unit => PixelScale::Unit,
        }
    }
}

impl ServeArgs {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            fallback_threshold: self.fallback_threshold,
            ai_takeover: self.ai_takeover,
            ml_enabled: self.ml_enabled,
            analysis_timeout: Duration::from_secs(self.analysis_timeout_secs),
            chat_timeout: Duration::from_secs(self.chat_timeout_secs),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ModelsArgs {
    /// API key to list models for
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: String,

    /// API root
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

/// Runtime knobs the handlers need.
#[derive(Debug, Clone)]
pub struct Settings {
    pub fallback_threshold: f64,
    pub ai_takeover: bool,
    pub ml_enabled: bool,
    pub analysis_timeout: Duration,
    pub chat_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fallback_threshold: 50.0,
            ai_takeover: true,
            ml_enabled: true,
            analysis_timeout: Duration::from_secs(20),
            chat_timeout: Duration::from_secs(30),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve(args: &[&str]) -> ServeArgs {
        let mut argv = vec!["leafscan", "serve"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Serve(a) => a,
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let a = serve(&[
            "--port",
            "9000",
            "--fallback-threshold",
            "65",
            "--ai-takeover",
            "false",
            "--ml-enabled",
            "no",
        ]);
        assert_eq!(a.port, 9000);
        assert_eq!(a.fallback_threshold, 65.0);
        assert!(!a.ai_takeover);
        assert!(!a.ml_enabled);
        assert_eq!(a.bind_addr().unwrap().port(), 9000);
    }

    #[test]
    fn settings_carry_timeouts() {
        let s = serve(&["--analysis-timeout-secs", "5", "--chat-timeout-secs", "7"]).settings();
        assert_eq!(s.analysis_timeout, Duration::from_secs(5));
        assert_eq!(s.chat_timeout, Duration::from_secs(7));
    }

    #[test]
    fn stats_checkpoint_interval() {
        assert_eq!(serve(&[]).stats_save_secs, 60);
        assert_eq!(serve(&["--stats-save-secs", "0"]).stats_save_secs, 0);
    }

    #[test]
    fn pixel_scale_flag() {
        let a = serve(&["--pixel-scale", "unit"]);
        assert_eq!(PixelScale::from(a.pixel_scale), PixelScale::Unit);
    }

    #[test]
    fn models_takes_key() {
        assert!(Cli::try_parse_from(["leafscan", "models", "--llm-api-key", "k"]).is_ok());
    }
}
