use std::sync::Arc;

use anyhow::Context;

use gatehouse_api::{AppConfig, build_app};
use gatehouse_auth::UserDirectory;
use gatehouse_infra::InMemoryUserDirectory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatehouse_observability::init();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let directory = directory(&config).await?;
    let app = build_app(&config, directory).context("failed to build router")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        env = ?config.environment,
        insecure_secret = config.secret.is_insecure_default(),
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn directory(config: &AppConfig) -> anyhow::Result<Arc<dyn UserDirectory>> {
    use gatehouse_infra::PostgresUserDirectory;

    match &config.database_url {
        Some(url) => {
            let dir = PostgresUserDirectory::connect(url, config.password_pepper.clone())
                .await
                .context("failed to connect to postgres")?;
            dir.migrate().await.context("failed to migrate users table")?;
            tracing::info!("using postgres user directory");
            Ok(Arc::new(dir))
        }
        None => Ok(in_memory()),
    }
}

#[cfg(not(feature = "postgres"))]
async fn directory(config: &AppConfig) -> anyhow::Result<Arc<dyn UserDirectory>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL set but postgres support is not compiled in");
    }
    Ok(in_memory())
}

fn in_memory() -> Arc<dyn UserDirectory> {
    tracing::info!("using in-memory user directory");
    Arc::new(InMemoryUserDirectory::new())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
