use clap::Parser;
use std::{net::SocketAddr, path::PathBuf};

/// Minimum length of `--secret`, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Personal expense tracker serving a small web UI over a CSV file.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub(crate) struct Config {
    /// CSV file holding the expenses; created with its header if missing
    #[arg(long, env = "EXPENSES_STORE", default_value = "expenses.csv")]
    pub store: PathBuf,

    /// Address to listen on
    #[arg(long, env = "EXPENSES_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Secret the notice cookie key is derived from (at least 32 bytes).
    /// A random key is used when it is not given.
    #[arg(long, env = "EXPENSES_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

impl Config {
    pub fn check(&self) -> Result<(), anyhow::Error> {
        if let Some(secret) = &self.secret {
            if secret.len() < MIN_SECRET_LEN {
                anyhow::bail!("secret must be at least {MIN_SECRET_LEN} bytes long");
            }
        }
        Ok(())
    }
}
