//! Serves one proxied exchange on the client socket inherited as stdin.
//!
//! Spawned by `relay-proxy --strategy process`; not meant to be run by hand.

use std::process::ExitCode;

#[cfg(unix)]
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    use clap::Parser;
    use relay_proxy::dispatch::process::{serve_inherited_socket, WorkerArgs};
    use relay_proxy::observability::logging;

    let args = WorkerArgs::parse();
    logging::init(&args.log_level);

    match serve_inherited_socket(&args).await {
        Ok(outcome) => {
            tracing::debug!(outcome = outcome.label(), pid = std::process::id(), "Worker done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Stdin is not a usable client socket");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    eprintln!("relay-worker: the process strategy requires a Unix platform");
    ExitCode::FAILURE
}
