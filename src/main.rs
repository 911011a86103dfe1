//! waiterdesk - restaurant floor client
//!
//! This is the binary entry point. All logic lives in the library.

use clap::Parser;

use waiterdesk::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    waiterdesk_core::logging::init()?;

    let args = Args::parse();
    waiterdesk::run(args).await?;
    Ok(())
}
