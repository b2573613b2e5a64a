//! scanflow - batch OCR for scanned PDF documents.

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    cli::run().await
}
