use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Connection and storage options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Base URL of the risk service
    #[arg(long, global = true, env = "EDUPREDICT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// Directory holding the persisted session (defaults to ~/.edupredict)
    #[arg(long, global = true, env = "EDUPREDICT_HOME")]
    pub home: Option<PathBuf>,
    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "EDUPREDICT_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
    /// Accept any credentials when the login endpoint fails
    #[arg(
        long,
        global = true,
        env = "EDUPREDICT_OFFLINE_LOGIN",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub offline_login: bool,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub home: PathBuf,
    pub timeout: Duration,
    pub offline_login: bool,
}

impl Config {
    pub fn resolve(args: &GlobalArgs) -> anyhow::Result<Self> {
        let home = match &args.home {
            Some(path) => path.clone(),
            None => default_home()?,
        };

        Ok(Self {
            api_url: args.api_url.trim_end_matches('/').to_string(),
            home,
            timeout: Duration::from_secs(args.timeout_secs.max(1)),
            offline_login: args.offline_login,
        })
    }
}

fn default_home() -> anyhow::Result<PathBuf> {
    home_under(dirs::home_dir())
}

fn home_under(user_home: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    user_home
        .map(|dir| dir.join(".edupredict"))
        .context("cannot locate the user's home directory; pass --home or EDUPREDICT_HOME")
}
