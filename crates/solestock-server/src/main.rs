mod api;
mod imports;
mod middleware;
mod notify;

use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    imports::ImportJobStore,
    middleware::AuthState,
    notify::WebhookNotifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = solestock_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = solestock_db::PoolConfig::from_app_config(&config);
    let pool = solestock_db::connect_pool(&config.database_url, pool_config).await?;
    solestock_db::run_migrations(&pool).await?;

    let grade_source = solestock_db::detect_grade_source(&pool).await?;
    tracing::info!(source = ?grade_source, "grade storage detected");

    let notifier = WebhookNotifier::new(config.webhook_urls.clone(), config.notify_timeout_secs)?;
    if config.webhook_urls.is_empty() {
        tracing::warn!("no SOLESTOCK_WEBHOOK_URLS configured; order notifications are disabled");
    }

    let auth = AuthState::from_keys(&config.admin_api_keys, config.is_development())?;
    let state = AppState {
        pool,
        grade_source,
        notifier: Arc::new(notifier),
        import_jobs: ImportJobStore::default(),
        sample_grades_path: config.sample_grades_path.clone(),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    tracing::info!(addr = %config.bind_addr, env = %config.env, "solestock server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
