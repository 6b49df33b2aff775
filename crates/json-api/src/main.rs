//! Consent Ledger JSON API Server

use salvo::{
    affix_state::inject,
    oapi::{
        OpenApi,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
        swagger_ui::SwaggerUi,
    },
    prelude::*,
    trailing_slash::remove_slash,
};
use tracing::{error, info};

use consent_app::context::{AppContext, StorageSettings};

use crate::{config::ServerConfig, state::State};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod audit;
mod config;
mod consents;
mod extensions;
mod healthcheck;
mod observability;
mod process;
mod router;
mod shutdown;
mod state;
mod sweeper;
#[cfg(test)]
mod test_helpers;

/// Consent Ledger JSON API Server entry point
#[tokio::main]
pub async fn main() {
    // Load configuration from .env and CLI arguments
    let config = ServerConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        std::process::exit(1);
    });

    if let Err(init_error) = observability::init(&config) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Observability error: {init_error}");
        }

        std::process::exit(1);
    }

    let addr = config.socket_addr();

    info!(
        approval_mode = %config.consents.approval_mode,
        approval_token_ttl_hours = config.consents.approval_token_ttl_hours,
        "Starting server on {addr}"
    );

    let listener = TcpListener::new(addr).bind().await;

    let storage = StorageSettings {
        lock_timeout: config.database.lock_timeout(),
        ..StorageSettings::default()
    };

    let app = match AppContext::from_database_url(
        &config.database.database_url,
        storage,
        config.consents.to_consents_config(),
    )
    .await
    {
        Ok(app) => app,
        Err(init_error) => {
            error!("failed to initialize app context: {init_error}");

            std::process::exit(1);
        }
    };

    let sweeper = config
        .sweep
        .interval()
        .map(|period| sweeper::spawn(app.consents.clone(), period));

    let admin_api_key = config.admin.api_key().map(ToOwned::to_owned);

    if admin_api_key.is_none() {
        info!("ADMIN_API_KEY is not set, audit routes are disabled");
    }

    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(observability::request_logging)
        .hoop(remove_slash())
        .hoop(inject(State::from_app_context(app, admin_api_key)))
        .push(router::app_router());

    let doc = OpenApi::new("Consent Ledger API", env!("CARGO_PKG_VERSION"))
        .add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                admin::middleware::API_KEY_HEADER,
            ))),
        )
        .merge_router(&router);

    let router = router
        .push(doc.into_router("/api-doc/openapi.json"))
        .push(SwaggerUi::new("/api-doc/openapi.json").into_router("docs"));

    let server = Server::new(listener);

    let handle = server.handle();

    // Listen for shutdown signal
    tokio::spawn(async move {
        if let Err(error) = shutdown::listen(handle, sweeper.into_iter().collect()).await {
            error!("failed to listen for shutdown signal: {error}");
        }
    });

    // Start serving requests
    server.serve(router).await;
}
