//! danmu-probe: watch one live room's chat for a fixed window.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use danmu_core::DanmuConfig;
use danmu_live::cli::{self, CliError};
use danmu_live::{BiliLiveClient, PrintHandler};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = DanmuConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        DanmuConfig::default()
    });
    let probe = config.probe;

    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let result = cli::probe_main(
        std::env::args().skip(1),
        &probe,
        Arc::new(PrintHandler),
        |room_id| BiliLiveClient::new(room_id, probe.clone()),
        interrupt,
    )
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ CliError::Usage(_)) => {
            eprintln!("{e}");
            eprintln!("{}", cli::USAGE);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
