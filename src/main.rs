//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crm_schema::{app, AppState, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG controla o nível, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    // Roda as migrações do SQLx na inicialização (só quando há Postgres)
    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!().run(pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    let listener = TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app(app_state)).await?;
    Ok(())
}
