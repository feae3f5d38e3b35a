//! URI signing CLI commands.

pub mod keygen;
pub mod sign;
pub mod verify;

use super::{Cli, Command};

pub async fn dispatch(cli: Cli) -> i32 {
    match cli.cmd {
        Command::Keygen(args) => keygen::cmd_keygen(args),
        Command::Sign(args) => sign::cmd_sign(args),
        Command::Verify(args) => verify::cmd_verify(args).await,
    }
}
