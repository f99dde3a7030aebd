use std::process::ExitCode;

fn main() -> ExitCode {
    match eventmgrd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("eventmgrd: {error}");
            ExitCode::FAILURE
        }
    }
}
