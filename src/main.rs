use anyhow::Result;
use fenbi_crawler::utils::logging;
use fenbi_crawler::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志（guard 必须持有到程序结束）
    let _guard = logging::init(&config.log_dir);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
