use std::process::Command;

/// Exit code reported when a container command could not be executed at all
/// (missing binary, permission denied, ...). Outside the range any real
/// process can exit with, so it always classifies as an error.
pub const RUNNER_FAILURE_EXIT_CODE: i32 = -9999;

/// One container's entrypoint, runnable as a local OS process.
///
/// Built by `SyncContext::build_container_commands`; `run` blocks the caller
/// until the process exits. Concurrency across containers, if wanted, is up
/// to the hook author.
pub struct ContainerCmd {
    pub container_name: String,
    pub program: String,
    pub args: Vec<String>,
    pub exit_code: i32,
    pub exit_error: Option<std::io::Error>,
}

impl ContainerCmd {
    pub fn new(container_name: String, program: String, args: Vec<String>) -> Self {
        ContainerCmd {
            container_name,
            program,
            args,
            exit_code: 0,
            exit_error: None,
        }
    }

    /// Run the command to completion and record its outcome.
    ///
    /// A process killed by a signal has no exit code; `-1` is recorded
    /// there, matching what the platform reports upstream.
    pub fn run(&mut self) {
        match Command::new(&self.program).args(&self.args).status() {
            Ok(status) => {
                self.exit_code = status.code().unwrap_or(-1);
            }
            Err(e) => {
                self.exit_code = RUNNER_FAILURE_EXIT_CODE;
                self.exit_error = Some(e);
            }
        }
    }
}
