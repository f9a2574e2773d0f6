//! Binary for the `tabiji` command-line tool.
//!
//! - `serve`: the HTTP API
//! - `chat`: a terminal conversation, in-process or against a server
//! - `transcribe`: one-off speech-to-text

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cmd = cli::Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cmd.command.default_log_filter())),
        )
        .init();

    cmd.run().await
}
