//! `url-trust verify` - Check a signed URI against trusted keys.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;
use url::Url;

use url_trust::{TrustConfig, UrlTrustVerifier};

use crate::exit_codes;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Signed URI
    pub uri: String,

    /// Trusted-key file (YAML or JSON)
    #[arg(long, env = "URL_TRUST_KEYS_FILE")]
    pub keys: Option<PathBuf>,

    /// Verify as of this time, in epoch milliseconds (default: now)
    #[arg(long)]
    pub now: Option<i64>,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

pub async fn cmd_verify(args: VerifyArgs) -> i32 {
    match run_verify(&args).await {
        Ok(true) => {
            if !args.quiet {
                println!("trusted");
            }
            exit_codes::SUCCESS
        }
        Ok(false) => {
            if !args.quiet {
                println!("not trusted (use --verbose for the reason)");
            }
            exit_codes::NOT_TRUSTED
        }
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {e:#}");
            }
            exit_codes::for_error(&e)
        }
    }
}

async fn run_verify(args: &VerifyArgs) -> Result<bool> {
    let uri = Url::parse(&args.uri).with_context(|| format!("invalid uri: {}", args.uri))?;

    let mut config = TrustConfig::from_env();
    if let Some(keys) = &args.keys {
        config = config.with_keys_file(keys);
    }
    if config.keys_file.is_none() {
        tracing::warn!("no keys file given, every uri will be rejected");
    }

    let verifier = UrlTrustVerifier::from_config(&config)?;
    let now = args.now.unwrap_or_else(|| Utc::now().timestamp_millis());

    Ok(verifier.is_trusted_at(&uri, now).await)
}
