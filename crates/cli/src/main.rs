use std::process::ExitCode;

fn main() -> ExitCode {
    vlog_cli::run()
}
