use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use litsweep_core::Backend;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "litsweep")]
#[command(
    author,
    version,
    about = "Resumable literature harvester for IEEE Xplore, Springer Nature, Scopus and PubMed"
)]
#[command(after_help = "Examples:
  litsweep harvest --primary biases.txt --secondary keywords.txt
  litsweep harvest --config survey.toml --backend scopus --backend pubmed
  litsweep status --output-dir runs/survey
  litsweep reset --backend springer")]
pub struct Config {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run or resume a harvest on every selected backend concurrently
    #[command(after_help = "Examples:
  litsweep harvest --primary biases.txt --secondary keywords.txt
  litsweep harvest --backend ieee --output-dir runs/ieee-only
  litsweep harvest --config ~/survey.toml       # terms and keys from a config file")]
    Harvest(HarvestArgs),
    /// Show the checkpoint of every backend in an output directory
    Status {
        /// Directory holding checkpoints and results
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Custom path to the config file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Delete a backend's checkpoint so its next harvest starts over
    Reset {
        /// Backend whose checkpoint is deleted
        #[arg(short, long, value_name = "BACKEND")]
        backend: Backend,

        /// Directory holding checkpoints and results
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Custom path to the config file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct HarvestArgs {
    /// Custom path to the config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// File with one primary (bias) term per line
    #[arg(short, long, value_name = "FILE")]
    pub primary: Option<PathBuf>,

    /// File with one secondary keyword per line
    #[arg(short, long, value_name = "FILE")]
    pub secondary: Option<PathBuf>,

    /// Backend to run; repeat for several. Defaults to every enabled backend
    #[arg(short, long = "backend", value_name = "BACKEND")]
    pub backends: Vec<Backend>,

    /// Directory for checkpoints, results and logs
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: Credentials,
}

/// API credentials; each falls back to the config file when unset.
#[derive(Args, Debug, Default, Clone)]
pub struct Credentials {
    /// IEEE Xplore API key
    #[arg(long, env = "IEEE_API_KEY", hide_env_values = true)]
    pub ieee_api_key: Option<String>,

    /// Springer Nature API key
    #[arg(long, env = "SPRINGER_API_KEY", hide_env_values = true)]
    pub springer_api_key: Option<String>,

    /// Elsevier Scopus API key
    #[arg(long, env = "SCOPUS_API_KEY", hide_env_values = true)]
    pub scopus_api_key: Option<String>,

    /// Scopus institution token
    #[arg(long, env = "SCOPUS_INSTTOKEN", hide_env_values = true)]
    pub scopus_insttoken: Option<String>,

    /// NCBI E-utilities API key
    #[arg(long, env = "PUBMED_API_KEY", hide_env_values = true)]
    pub pubmed_api_key: Option<String>,
}

impl Credentials {
    pub fn api_key(&self, backend: Backend) -> Option<&str> {
        match backend {
            Backend::Ieee => self.ieee_api_key.as_deref(),
            Backend::Springer => self.springer_api_key.as_deref(),
            Backend::Scopus => self.scopus_api_key.as_deref(),
            Backend::PubMed => self.pubmed_api_key.as_deref(),
        }
    }
}
