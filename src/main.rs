#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = proctor_portal::run().await {
        eprintln!("proctor-portal fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
