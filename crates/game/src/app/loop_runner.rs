use std::process::ExitCode;

use polywalk_engine::{run_app, HostWiring};
use tracing::error;

pub(crate) fn run(wiring: HostWiring) -> ExitCode {
    if let Err(err) = run_app(wiring) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
