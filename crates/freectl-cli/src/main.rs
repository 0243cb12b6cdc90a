//! Entrypoint for the `freectl` binary.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    freectl_cli::run().await
}
