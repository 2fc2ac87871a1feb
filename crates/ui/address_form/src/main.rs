use address_form::cli::Cli;
use clap::Parser;
use color_eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    address_form::errors::init()?;
    address_form::logging::init()?;

    address_form::run(args).await
}
