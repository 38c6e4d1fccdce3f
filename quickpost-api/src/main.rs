use config::Env;
use quickpost_common::model::auth::{InvalidTokenLifetimeError, SigningKeyError, TokenService};
use quickpost_db::{client::DbClient, seed::SeedError};
use server::{ServerInfo, ServerState};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod server;
mod service;
#[cfg(test)]
mod test_support;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up token signing: {0}")]
    SigningKey(#[from] SigningKeyError),
    #[error("Invalid TOKEN_TTL_HOURS: {0}")]
    TokenLifetime(#[from] InvalidTokenLifetimeError),
    #[error("Error seeding demo data: {0}")]
    Seed(#[from] SeedError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "quickpost_api=debug,\
                quickpost_common=debug,\
                quickpost_db=debug,\
                tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn build_state(env: &Env) -> Result<ServerState, InitError> {
    if env.jwt_secret.is_demo_secret() {
        warn!("JWT_SECRET is not set, tokens are signed with the public demo secret");
    }
    let tokens = TokenService::new(env.jwt_secret.as_bytes(), env.token_lifetime()?)?;

    let db_client = DbClient::new();
    if env.seed_demo_data {
        db_client.seed_demo_data()?;
    }

    Ok(ServerState {
        db_client: Arc::new(db_client),
        tokens: Arc::new(tokens),
        info: ServerInfo::new(env.app_env),
    })
}

/// Cancels `shutdown` on Ctrl-C or, on unix, SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                error!(%error, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown requested");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;
    debug!(?env, "Loaded configuration");

    let app = server::app(build_state(&env)?);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, mode = ?env.app_env, "Listening");

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    info!("Server stopped");
    Ok(())
}
