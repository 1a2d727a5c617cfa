use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::models::BackendKind;

#[derive(Parser, Debug)]
#[command(
    name = "skinsight",
    about = "Analyze a skin lesion photograph and report melanoma risk",
    version
)]
pub struct Cli {
    /// Image of the lesion (JPG, PNG or WEBP, max 10MB)
    pub image: PathBuf,

    /// Classification backend [default: from config, else local]
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<BackendArg>,

    /// Local classifier predict URL (overrides config and API_URL)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Config file [default: ./.skinsight/config.toml, fallback ~/.config/skinsight/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Show model details and debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print a summary line
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Flags win over file and environment settings.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(backend) = &self.backend {
            config.backend = backend.into();
        }
        if let Some(url) = &self.api_url {
            config.local.url = Some(url.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum BackendArg {
    Hosted,
    Local,
}

impl From<&BackendArg> for BackendKind {
    fn from(arg: &BackendArg) -> Self {
        match arg {
            BackendArg::Hosted => BackendKind::Hosted,
            BackendArg::Local => BackendKind::Local,
        }
    }
}
