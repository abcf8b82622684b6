use std::net::SocketAddr;
use std::sync::Arc;

use shared::chat_orchestrator::ChatOrchestrator;
use shared::config::ApiConfig;
use shared::llm::{ChatGateway, OpenAiChatGateway, OpenAiGatewayConfig};
use shared::repos::Store;
use tracing::{error, info};

mod http;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,axum=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let store = match Store::connect(&config.database_url, config.database_max_connections).await {
        Ok(store) => store,
        Err(err) => {
            error!("failed to connect to postgres: {err}");
            std::process::exit(1);
        }
    };

    let migrator = match sqlx::migrate::Migrator::new(config.migrations_dir.clone()).await {
        Ok(migrator) => migrator,
        Err(err) => {
            error!("failed to load migrations: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = migrator.run(store.pool()).await {
        error!("failed to run migrations: {err}");
        std::process::exit(1);
    }

    let chat_gateway: Arc<dyn ChatGateway> = match OpenAiChatGateway::new(OpenAiGatewayConfig {
        base_url: config.openai_base_url.clone(),
        api_key: config.openai_api_key.clone(),
        timeout_ms: config.chat_timeout_ms,
    }) {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            error!("failed to build chat provider client: {err}");
            std::process::exit(1);
        }
    };

    // Study plans get their own client so the longer generation window
    // never loosens the interactive chat timeout.
    let plan_gateway: Arc<dyn ChatGateway> = match OpenAiChatGateway::new(OpenAiGatewayConfig {
        base_url: config.openai_base_url.clone(),
        api_key: config.openai_api_key.clone(),
        timeout_ms: config.study_plan_timeout_ms,
    }) {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            error!("failed to build study plan provider client: {err}");
            std::process::exit(1);
        }
    };

    let orchestrator = ChatOrchestrator::new(
        store.clone(),
        chat_gateway.clone(),
        plan_gateway,
        config.chat_timeout_ms,
        config.study_plan_timeout_ms,
    );

    let app = http::build_router(http::AppState {
        store,
        orchestrator,
        gateway: chat_gateway,
        default_model: config.openai_default_model,
    });

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(listener, app).await.expect("server should run");
}
