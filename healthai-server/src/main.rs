//! HealthAI服务器主程序

use anyhow::Context;
use clap::Parser;
use healthai_core::{AppConfig, PasswordHasher};
use healthai_database::{MemoryUserStore, PgUserStore, UserStore};
use healthai_inference::{ChatClient, DiagnosisClient, PredictionClient};
use healthai_web::{AppState, Metrics, WebServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// HealthAI服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "healthai-server")]
#[command(about = "HealthAI 学生健康服务后端")]
struct Args {
    /// 服务器端口，覆盖配置文件
    #[arg(short, long)]
    port: Option<u16>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    info!("启动HealthAI服务器...");

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if config.inference.chat_api_key.is_none() {
        config.inference.chat_api_key = std::env::var("OPENROUTER_API_KEY").ok();
    }
    if config.inference.chat_api_key.is_none() {
        warn!("No chat API key configured, symptom check requests will fail");
    }

    let store: Arc<dyn UserStore> = match config.database.url.as_deref() {
        Some(url) => {
            info!("Using PostgreSQL user store");
            Arc::new(PgUserStore::connect(url, config.database.max_connections).await?)
        }
        None => {
            warn!("No database URL configured, users are kept in memory");
            Arc::new(MemoryUserStore::new())
        }
    };

    let state = AppState::new(
        store,
        PasswordHasher::new(config.auth.pbkdf2_iterations),
        Arc::new(PredictionClient::new(&config.inference)?),
        Arc::new(ChatClient::new(&config.inference)?),
        Arc::new(DiagnosisClient::new(&config.inference)?),
        Arc::new(Metrics::new()?),
    );

    info!("HealthAI服务器配置:");
    info!("  监听地址: {}", config.bind_address());
    info!("  预测服务: {}", config.inference.prediction_base_url);
    info!("  诊断服务: {}", config.inference.diagnosis_url);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_address()))?;
    let server = WebServer::new(addr, state, config.server.max_upload_bytes);

    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e);
    }

    Ok(())
}
