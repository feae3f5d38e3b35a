//! `url-trust sign` - Append `ts` and `sign` to a URI.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use url::Url;

use url_trust::UrlSigner;

use crate::exit_codes;

#[derive(Args, Debug)]
pub struct SignArgs {
    /// URI to sign (must not already carry `ts` or `sign`)
    pub uri: String,

    /// Private key file (PKCS#8 PEM)
    #[arg(long, short)]
    pub key: PathBuf,

    /// Timestamp in epoch milliseconds (default: now)
    #[arg(long)]
    pub ts: Option<i64>,
}

pub fn cmd_sign(args: SignArgs) -> i32 {
    match run_sign(args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::for_error(&e)
        }
    }
}

fn run_sign(args: SignArgs) -> Result<()> {
    let uri = Url::parse(&args.uri).with_context(|| format!("invalid uri: {}", args.uri))?;
    let signer = UrlSigner::from_pem_file(&args.key)?;

    let signed = match args.ts {
        Some(ts) => signer.sign_at(&uri, ts)?,
        None => signer.sign(&uri)?,
    };

    tracing::debug!(public_key = %signer.public_key_base64(), "signed uri");
    println!("{signed}");
    Ok(())
}
