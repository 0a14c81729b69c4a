//! `WaveCaptcha` - Distorted-text image CAPTCHA service.
//!
//! Copyright (C) 2026 Maverick
//! SPDX-License-Identifier: AGPL-3.0-only
//!
//! Loads configuration, sets up logging, and serves the CAPTCHA form,
//! image and verification endpoints.

use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wavecaptcha::{AppState, FontDirectory, ServerConfig, serve};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(non_blocking);

    if log_format.eq_ignore_ascii_case("pretty") {
        subscriber.init();
    } else {
        subscriber.json().init();
    }

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        listen_addr = %config.listen_addr,
        font_dir = %config.font_dir.display(),
        format = ?config.captcha.format,
        log_format = %config.log_format,
        "Server initialized"
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let fonts = Arc::new(FontDirectory::new(config.font_dir.clone()));
    let state = Arc::new(AppState::new(Arc::clone(&config), fonts));

    let result: wavecaptcha::Result<()> = runtime.block_on(async move {
        let listener = TcpListener::bind(config.listen_addr).await?;
        serve(listener, state).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server stopped");
            ExitCode::FAILURE
        }
    }
}
