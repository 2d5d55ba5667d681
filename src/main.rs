use anyhow::Result;
use interview_copilot::utils::logging;
use interview_copilot::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（文件缺失时回退到环境变量 + 默认值）
    let config = Config::load("interview_copilot.toml");

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
