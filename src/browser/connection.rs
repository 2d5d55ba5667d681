use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::services::scanner::is_supported_platform;

/// 连接到浏览器并定位面试页面
///
/// 按优先级选择页面：
/// 1. URL 属于已知面试平台的标签页
/// 2. 已打开的第一个标签页
/// 3. 新建空白页
pub async fn connect_to_interview_page(port: u16) -> AppResult<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    // 优先选择已知面试平台的标签页
    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            debug!("检查页面: {}", url);
            if is_supported_platform(&url) {
                info!("✓ 找到面试平台页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    if let Some(first) = pages.into_iter().next() {
        warn!("⚠️ 未找到已知面试平台的标签页，使用第一个标签页");
        return Ok((browser, first));
    }

    debug!("浏览器没有打开的标签页，创建空白页面");
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建空白页面失败: {}", e);
        e
    })?;
    Ok((browser, page))
}
