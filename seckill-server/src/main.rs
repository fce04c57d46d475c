use seckill_server::{Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 配置, 日志)
    let config = setup_environment();

    print_banner();
    tracing::info!("⚡ Seckill server starting...");

    // 2. 初始化服务器状态 (存储、缓存、服务)
    let state = ServerState::initialize(&config)?;

    // 3. 启动 HTTP 服务器 (Server::serve 会自动启动后台任务)
    let server = Server::new(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
