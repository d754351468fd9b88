mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use benefit_engine::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
