use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use counsel::ChatConfig;
use counsel::chat::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, GROQ_CHAT_URL};
use daemon_common::LogLevel;

/// Command line arguments for the assessd binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "assessd",
    about = "Emotion tracking and career assessment API"
)]
pub struct Args {
    /// Key for the chat completions API
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chat completions endpoint
    #[arg(long, env = "GROQ_API_URL", default_value = GROQ_CHAT_URL)]
    pub api_url: String,

    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Seconds to wait for the model before giving up
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Emotion samples kept after each query
    #[arg(long, default_value = "20")]
    pub retention: NonZeroUsize,

    /// Webcam device index
    #[arg(long, default_value_t = 0)]
    pub camera: i32,

    /// Haar cascade used to find faces
    #[arg(
        long,
        default_value = "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml"
    )]
    pub cascade: PathBuf,

    /// FER+ ONNX emotion model
    #[arg(long, default_value = "models/emotion-ferplus-8.onnx")]
    pub emotion_model: PathBuf,

    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,

    /// Run as a background daemon
    #[arg(short = 'd', long)]
    pub daemon: bool,
}

impl Args {
    /// Chat settings, or `None` when no usable API key was given.
    pub fn chat_config(&self) -> Option<ChatConfig> {
        let key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        Some(ChatConfig {
            url: self.api_url.clone(),
            api_key: key.to_string(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
