use std::process::ExitCode;

fn main() -> ExitCode {
    spreadline_cli::run()
}
