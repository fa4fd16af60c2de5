//! Fetch a URL and print what came back.
//!
//! Run with: cargo run --example fetch -- <url> [config.json]

use std::time::Duration;

use anyhow::{bail, Context};
use strand_http::{ClientConfig, ErrorKind, HttpClient, HttpRequest};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        bail!("usage: fetch <url> [config.json]");
    };
    let config = match args.next() {
        Some(path) => ClientConfig::from_json_file(&path)
            .with_context(|| format!("loading {}", path))?,
        None => ClientConfig::synchronous(),
    };

    let client = HttpClient::new(config).context("creating client")?;
    let request = HttpRequest::get(&url)
        .with_transfer_timeout(Duration::from_secs(30))
        .with_logger(|line| eprintln!("* {}", line));
    let response = client.request(&request);

    if response.error() != ErrorKind::Ok {
        bail!("{}: {}", response.error(), response.description());
    }

    println!("Status: {}", response.status());
    for (name, value) in response.headers().iter() {
        println!("  {}: {}", name, value);
    }
    println!(
        "Body: {} bytes ({} on the wire, {} sent)",
        response.payload().len(),
        response.download_size(),
        response.upload_size()
    );
    Ok(())
}
