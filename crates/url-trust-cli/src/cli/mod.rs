pub mod commands;

use clap::{Parser, Subcommand};

use commands::{keygen, sign, verify};

#[derive(Parser, Debug)]
#[command(
    name = "url-trust",
    version,
    about = "Sign and verify extension-scoped URIs"
)]
pub struct Cli {
    /// Log rejection reasons (sets the default filter to trace)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate an RSA keypair for signing URIs
    Keygen(keygen::KeygenArgs),

    /// Append `ts` and `sign` to a URI
    Sign(sign::SignArgs),

    /// Check a signed URI against trusted keys
    Verify(verify::VerifyArgs),
}
