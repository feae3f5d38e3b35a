//! `url-trust keygen` - Generate an RSA keypair for signing URIs.

use anyhow::{Context, Result};
use clap::Args;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use std::fs;
use std::path::PathBuf;

use url_trust::UrlSigner;

use crate::exit_codes;

const KEY_BITS: usize = 2048;

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for keypair files
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Force overwrite existing files
    #[arg(long, short)]
    pub force: bool,
}

pub fn cmd_keygen(args: KeygenArgs) -> i32 {
    match run_keygen(args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::for_error(&e)
        }
    }
}

fn run_keygen(args: KeygenArgs) -> Result<()> {
    if !args.out.exists() {
        fs::create_dir_all(&args.out)
            .with_context(|| format!("failed to create directory: {}", args.out.display()))?;
    }

    let private_path = args.out.join("private_key.pem");
    let public_path = args.out.join("public_key.pem");

    if !args.force {
        for path in [&private_path, &public_path] {
            if path.exists() {
                anyhow::bail!(
                    "key already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
        }
    }

    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), KEY_BITS)
        .context("failed to generate RSA key")?;

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .context("failed to encode private key as PKCS#8 PEM")?;
    let public_pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .context("failed to encode public key as SPKI PEM")?;

    // Write private key with restricted permissions
    fs::write(&private_path, private_pem.as_bytes())
        .with_context(|| format!("failed to write private key: {}", private_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&private_path, perms)
            .with_context(|| format!("failed to set permissions on: {}", private_path.display()))?;
    }

    fs::write(&public_path, public_pem)
        .with_context(|| format!("failed to write public key: {}", public_path.display()))?;

    let signer = UrlSigner::new(private_key)?;

    println!("Generated RSA-{KEY_BITS} keypair:");
    println!(
        "  Private key: {} (PKCS#8 PEM, mode 0600)",
        private_path.display()
    );
    println!("  Public key:  {} (SPKI PEM)", public_path.display());
    println!();
    println!("public_key: {}", signer.public_key_base64());
    println!();
    println!("Add this public_key under your identity in trusted_url_public_keys.");

    Ok(())
}
