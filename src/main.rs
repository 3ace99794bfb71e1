//! Main entry point for the hyperfetch CLI application.
//!
//! Fetches a single URL through [`HyperFetch`], serving archive URLs from a
//! directory-backed runtime and passing everything else through to HTTP.

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::TryStreamExt;
use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue, RANGE};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use hyperfetch::{Cli, FetchOptions, FetchRequest, HyperFetch, LocalRuntimeFactory, Response};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut options =
        FetchOptions::new().runtime_factory(Arc::new(LocalRuntimeFactory::new(cli.root.clone())));
    if let Some(base) = &cli.base {
        options = options.base_url(base.clone());
    }
    let fetch = HyperFetch::new(options)?;

    let request = build_request(&cli)?;
    let mut response = fetch.fetch(request).await?;

    if cli.include {
        print_head(&response);
    }
    write_body(&mut response).await?;

    fetch.close().await?;

    if !response.ok() {
        bail!("request failed with status {}", response.status());
    }
    Ok(())
}

/// Turn command-line options into a request.
fn build_request(cli: &Cli) -> Result<FetchRequest> {
    let method = Method::from_bytes(cli.method().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method {}", cli.method()))?;
    let mut request = FetchRequest::new(cli.url.clone()).method(method);

    for header in cli.parsed_headers() {
        let Some((name, value)) = header else {
            bail!("headers must look like `Name: value`");
        };
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name {name}"))?;
        let value =
            HeaderValue::from_str(value).with_context(|| format!("invalid header value {value}"))?;
        request = request.header(name, value);
    }

    if let Some(range) = &cli.range {
        let value = HeaderValue::from_str(&format!("bytes={range}"))
            .with_context(|| format!("invalid range {range}"))?;
        request = request.header(RANGE, value);
    }

    Ok(request)
}

/// Print the status line and headers to stderr, keeping stdout for the body.
fn print_head(response: &Response) {
    eprintln!("{} {}", response.status(), response.status_text());
    for (name, value) in response.headers() {
        eprintln!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    eprintln!();
}

/// Stream the body to stdout chunk by chunk.
async fn write_body(response: &mut Response) -> Result<()> {
    let mut body = response.take_body()?;
    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = body.try_next().await? {
        stdout.write_all(&chunk).await?;
    }
    stdout.flush().await?;
    Ok(())
}
