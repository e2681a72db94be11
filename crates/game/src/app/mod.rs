mod bootstrap;
mod prefs;
mod terminal;

use std::process::ExitCode;

use tracing::error;

pub(crate) fn run() -> ExitCode {
    let wiring = match bootstrap::build_app() {
        Ok(wiring) => wiring,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = terminal::run(wiring) {
        error!(error = %err, "terminal_session_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
