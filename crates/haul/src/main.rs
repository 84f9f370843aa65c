use std::process::ExitCode;

use clap::Parser as _;
use haul::cli::{self, App};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let app = App::parse();
    cli::logger::init(app.verbose);

    cli::run(app).await
}
