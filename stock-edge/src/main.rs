use stock_edge::{Config, EngineState, Server, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();

    // 2. 加载配置
    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    // 3. 日志
    let log_dir = config.log_dir();
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.is_production()),
        Some(log_dir.as_path()),
    );

    print_banner();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        work_dir = %config.work_dir,
        "Stock Edge starting..."
    );

    // 4. 初始化引擎状态
    let state = EngineState::initialize(&config).await?;

    // 5. 启动 HTTP 服务器 (Server::run 会启动后台任务)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {e}");
        return Err(e.into());
    }

    Ok(())
}
