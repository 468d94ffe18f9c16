//! Shim binary that calls into the `powerlan_coordinator` library's `inner_main`.
use clap::Parser as _;
use eyre::Result;

use powerlan_coordinator::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Delegate to library entrypoint
    powerlan_coordinator::inner_main(Cli::parse()).await
}
