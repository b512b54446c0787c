use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{CrawlerError, Result};

/// 使用持久化的用户目录启动有界面的浏览器，登录状态保存在 `user_data_dir`
pub async fn launch_with_profile(
    user_data_dir: &str,
    chrome_executable: Option<&str>,
) -> Result<Browser> {
    info!("🚀 启动浏览器，用户目录: {}", user_data_dir);

    let mut builder = BrowserConfig::builder()
        .with_head()
        .user_data_dir(user_data_dir)
        .viewport(None)
        .args(vec![
            "--disable-blink-features=AutomationControlled",
            "--no-first-run",
            "--no-default-browser-check",
        ]);
    if let Some(executable) = chrome_executable {
        debug!("浏览器路径: {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        CrawlerError::Browser(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        CrawlerError::Browser(format!("启动浏览器失败: {}", e))
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok(browser)
}
