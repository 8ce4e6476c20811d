use std::process::ExitCode;

use hvac_portal_app::{seed, telemetry};
use hvac_portal_util::{database_url, load_env_file, Environment};

#[tokio::main]
async fn main() -> ExitCode {
    load_env_file();
    let environment = match Environment::from_env() {
        Ok(environment) => environment,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = telemetry::init_tracing(environment) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    match seed::run(&database_url()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
