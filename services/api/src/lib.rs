mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use disaster_shield::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
