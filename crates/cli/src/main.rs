use std::process::ExitCode;

fn main() -> ExitCode {
    hexbot_cli::run()
}
