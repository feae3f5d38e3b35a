use clap::Parser;

mod cli;
pub mod exit_codes;

use cli::commands::dispatch;
use cli::Cli;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = dispatch(cli).await;
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    // --verbose shows why a uri was rejected
    let default = if verbose { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
