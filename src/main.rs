use std::process::ExitCode;

fn main() -> ExitCode {
    match conso_metropoles::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
