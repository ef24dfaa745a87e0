use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wicket::{Identity, RecaptchaConfig, WicketBuilder};
use wicket_axum::CookieConfig;

const DEFAULT_LOG_FILTER: &str = "info,wicket=debug,wicket_core=debug,wicket_axum=debug";

/// Login gate server: CAPTCHA, per-IP admission, account lockout and sessions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "WICKET_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// reCAPTCHA site key rendered into the login form
    #[arg(long, env = "WICKET_RECAPTCHA_SITE_KEY")]
    recaptcha_site_key: String,

    /// reCAPTCHA secret used for server-side verification
    #[arg(long, env = "WICKET_RECAPTCHA_SECRET", hide_env_values = true)]
    recaptcha_secret: String,

    /// JSON file with the identities allowed to sign in
    #[arg(long, env = "WICKET_IDENTITIES")]
    identities: PathBuf,

    /// Drop the Secure flag from the session cookie (plain-HTTP development only)
    #[arg(long, env = "WICKET_INSECURE_COOKIES")]
    insecure_cookies: bool,
}

fn load_identities(path: &Path) -> Result<Vec<Identity>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading identities from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing identities in {}", path.display()))
}

/// Resolves once `signal` fires and tells the cleanup tasks to stop.
///
/// If the signal handler cannot be installed the server keeps running
/// instead of shutting down on startup.
async fn shutdown_signal(
    signal: impl Future<Output = std::io::Result<()>>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
) {
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let identities = load_identities(&cli.identities)?;
    tracing::info!(count = identities.len(), "Loaded identities");

    let wicket = WicketBuilder::new()
        .with_memory_storage(identities)?
        .with_recaptcha(RecaptchaConfig::new(
            cli.recaptcha_site_key.clone(),
            cli.recaptcha_secret,
        ))?
        .build()
        .await?;
    let wicket = Arc::new(wicket);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let tasks = wicket.start_background_tasks(shutdown_rx);

    let cookie_config = if cli.insecure_cookies {
        tracing::warn!("Session cookie is not marked Secure");
        CookieConfig::development()
    } else {
        CookieConfig::default()
    };

    let app = wicket_axum::routes(wicket)
        .with_cookie_config(cookie_config)
        .with_captcha_site_key(cli.recaptcha_site_key)
        .build();

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("binding {}", cli.listen))?;
    tracing::info!(address = %cli.listen, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c(), shutdown_tx))
    .await
    .context("server error")?;

    for task in tasks {
        task.await.context("cleanup task panicked")?;
    }

    Ok(())
}
