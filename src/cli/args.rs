//! Command-line argument parsing

use crate::error::{PushError, Result};
use crate::registry::client::LoginCredentials;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "registry-push")]
#[command(about = "Push a built image for a target environment to the registry")]
#[command(disable_version_flag = true)]
pub struct Args {
    /// Target environment to push (e.g. dev, prod)
    pub target: String,

    /// Image version (tag) to push; defaults to the configured version
    #[arg(long = "version", short = 'V')]
    pub version: Option<String>,

    /// Username for registry authentication
    #[arg(long)]
    pub username: Option<String>,

    /// Password for registry authentication
    #[arg(long)]
    pub password: Option<String>,

    /// Email for registry authentication
    #[arg(long)]
    pub email: Option<String>,

    /// API key used instead of username/password
    #[arg(long)]
    pub apikey: Option<String>,

    /// Push to the registry without logging in
    #[arg(long)]
    pub insecure: bool,

    /// Skip the image test step before pushing
    #[arg(long = "skip-tests", short = 'S')]
    pub skip_tests: bool,

    /// Path to the project configuration file
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn validate(&self) -> Result<()> {
        if self.apikey.is_some() && (self.username.is_some() || self.password.is_some()) {
            return Err(PushError::Validation(
                "--apikey cannot be combined with --username/--password".to_string(),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(PushError::Validation(
                "--username and --password must be provided together".to_string(),
            ));
        }
        Ok(())
    }

    /// Credentials to log in with, if any were supplied
    pub fn credentials(&self) -> Option<LoginCredentials> {
        if let Some(apikey) = &self.apikey {
            return Some(LoginCredentials::from_apikey(apikey));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(LoginCredentials::new(
                username.clone(),
                password.clone(),
                self.email.clone(),
            )),
            _ => None,
        }
    }
}
