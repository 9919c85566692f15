//! CLI entry point for the bibli resolver.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bibli_core::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
use bibli_core::{
    CrossrefBackend, DEFAULT_MAX_RETRIES, DoiBackend, DoiOrgBackend, InstitutionalProxy,
    RateLimiter, ReqwestTransport, RetryPolicy, UrlTransformer, validate_doi,
};
use clap::Parser;
use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, error, info, warn};

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::{Args, BackendChoice};

/// Default number of DOIs resolved at once.
const DEFAULT_CONCURRENCY: u8 = 10;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_config(args.config.as_deref())?;
    debug!(?file_config, "Configuration loaded");

    let failed = run(&args, &file_config).await?;
    if failed > 0 {
        warn!(failed, total = args.dois.len(), "Some DOIs could not be resolved");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds the selected backend and resolves every DOI, returning the failure count.
async fn run(args: &Args, file_config: &FileConfig) -> Result<usize> {
    let connect_timeout = file_config
        .connect_timeout_secs
        .map_or(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs);
    let read_timeout = file_config
        .read_timeout_secs
        .map_or(DEFAULT_READ_TIMEOUT, Duration::from_secs);
    let transport = Arc::new(
        ReqwestTransport::with_timeouts(connect_timeout, read_timeout)
            .context("Failed to build HTTP transport")?,
    );

    let max_retries = args
        .max_retries
        .or(file_config.max_retries)
        .unwrap_or(DEFAULT_MAX_RETRIES);
    let retry = RetryPolicy::with_max_attempts(max_retries);
    let concurrency = usize::from(
        args.concurrency
            .or(file_config.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY),
    );
    let proxy = select_proxy(args, file_config);

    info!(
        backend = ?args.backend,
        dois = args.dois.len(),
        concurrency,
        max_retries,
        proxied = proxy.is_some(),
        "Resolving DOIs"
    );

    match args.backend {
        BackendChoice::Crossref => {
            let mut builder = CrossrefBackend::builder()
                .transport(transport)
                .rate_limiter(Arc::new(RateLimiter::crossref_default()))
                .retry_policy(retry);
            if let Some(mailto) = args.mailto.as_ref().or(file_config.mailto.as_ref()) {
                builder = builder.mailto(mailto.clone());
            }
            if let Some(proxy) = proxy {
                builder = builder.proxy(proxy);
            }
            let backend = builder.build()?;
            Ok(resolve_all(&backend, &args.dois, concurrency).await)
        }
        BackendChoice::DoiOrg => {
            let (valid, invalid): (Vec<String>, Vec<String>) =
                args.dois.iter().cloned().partition(|doi| validate_doi(doi));
            for doi in &invalid {
                error!(doi = %doi, "Invalid DOI format");
            }

            let mut builder = DoiOrgBackend::builder()
                .transport(transport)
                .retry_policy(retry);
            if let Some(proxy) = proxy {
                builder = builder.proxy(proxy);
            }
            let backend = builder.build()?;
            Ok(invalid.len() + resolve_all(&backend, &valid, concurrency).await)
        }
    }
}

fn select_proxy(args: &Args, file_config: &FileConfig) -> Option<Arc<dyn UrlTransformer>> {
    if args.institutional_access {
        return Some(Arc::new(InstitutionalProxy::university_of_texas()));
    }
    args.proxy_host
        .as_ref()
        .or(file_config.institutional_proxy.as_ref())
        .map(|host| Arc::new(InstitutionalProxy::new(host.as_str())) as Arc<dyn UrlTransformer>)
}

/// Resolves `dois` concurrently, printing each record as a JSON line.
///
/// Returns how many DOIs failed.
async fn resolve_all<B: DoiBackend>(backend: &B, dois: &[String], concurrency: usize) -> usize {
    let mut results = stream::iter(dois)
        .map(|doi| async move { (doi, backend.resolve(doi).await) })
        .buffer_unordered(concurrency.max(1));

    let mut failed = 0;
    while let Some((doi, result)) = results.next().await {
        let line = result
            .map_err(anyhow::Error::from)
            .and_then(|record| serde_json::to_string(&record).map_err(anyhow::Error::from));
        match line {
            Ok(line) => {
                let mut stdout = io::stdout().lock();
                if let Err(write_error) = writeln!(stdout, "{line}") {
                    error!(doi = %doi, error = %write_error, "Failed to write record");
                    failed += 1;
                }
            }
            Err(resolve_error) => {
                error!(
                    doi = %doi,
                    backend = %backend.backend(),
                    error = %resolve_error,
                    "Failed to resolve DOI"
                );
                failed += 1;
            }
        }
    }
    failed
}
