use chrono::Duration;
use coursehub::auth::{AuthService, Passwords, TokenIssuer};
use coursehub::{
    apply_migrations, build_app, builtin_config, ensure_database_exists, load_from_file, resolve,
    seed, AppState, MemoryStore, PgStore, Settings, Store, StoreKind,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("coursehub=info,tower_http=info")
            }),
        )
        .init();

    let settings = Settings::from_env()?;
    let config = match &settings.model_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading entity model");
            load_from_file(path).await?
        }
        None => builtin_config()?,
    };
    let model = resolve(&config)?;

    let store: Arc<dyn Store> = match settings.store {
        StoreKind::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.db_max_connections)
                .connect(&settings.database_url)
                .await?;
            apply_migrations(&pool, &model).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let ttl = Duration::hours(settings.token_ttl_hours);
    let tokens = match &settings.jwt_secret {
        Some(secret) => TokenIssuer::new(secret.as_bytes(), ttl),
        None => {
            tracing::warn!("JWT_SECRET not set; using a random secret, tokens will not survive a restart");
            TokenIssuer::ephemeral(ttl)
        }
    };
    let passwords = Passwords::default();
    let auth = AuthService::new(store.clone(), passwords, tokens);
    let state = AppState::new(store, model, auth);
    if settings.seed {
        seed(&state).await?;
    }

    let app = build_app(state, settings.max_body_bytes);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("CourseHub listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
