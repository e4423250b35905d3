use crate::config::Config;
use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use url::Url;

/// Drive a browser through a fixed page-transition choreography so a human
/// can watch for flicker. Captures milestone screenshots along the way and
/// holds the browser open until the operator presses Enter.
#[derive(Debug, Clone, Parser)]
#[command(name = "flickerwatch", version, about)]
pub struct Cli {
    /// Path to a config.toml file
    #[arg(short = 'c', long, value_name = "PATH", env = "FLICKERWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address of the development server under inspection
    #[arg(long, value_name = "URL", env = "FLICKERWATCH_TARGET")]
    pub target: Option<String>,

    /// Directory screenshots are written to (default: system temp dir)
    #[arg(long, value_name = "DIR", env = "FLICKERWATCH_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long, action = ArgAction::SetTrue)]
    pub headless: bool,

    /// Number of rapid-transition iterations
    #[arg(long, value_name = "N")]
    pub iterations: Option<u32>,

    /// Disable coloured terminal output
    #[arg(long = "no-color", action = ArgAction::SetTrue, env = "NO_COLOR")]
    pub no_color: bool,
}

impl Cli {
    /// Fold CLI values into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(target) = &self.target {
            config.target_url = target.clone();
        }

        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }

        if self.headless {
            config.headless = true;
        }

        if let Some(iterations) = self.iterations {
            config.rapid_iterations = iterations;
        }
    }

    /// Reject malformed targets before any browser work starts.
    pub fn validate(&self, config: &Config) -> Result<()> {
        let url = Url::parse(&config.target_url)
            .with_context(|| format!("invalid target URL: {}", config.target_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("target URL must be http or https, got {}", url.scheme());
        }
        Ok(())
    }
}
