use anyhow::Context;
use chrono::Utc;

use scholaris_api::app::build_app;
use scholaris_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();
    scholaris_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let (app, services) = build_app(&config).context("failed to build services")?;
    match &config.superadmin {
        Some(seed) => {
            services
                .seed_superadmin(seed, Utc::now())
                .await
                .context("failed to seed superadmin")?;
        }
        None => tracing::warn!("SUPERADMIN_EMAIL not set; no platform operator account"),
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
