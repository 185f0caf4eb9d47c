//! cosign: propose, confirm and execute multi-owner Safe transactions

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cosign_client::cli::run().await?;
    Ok(())
}
