use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到浏览器并获取平台页面
///
/// 平台要求登录，而登录流程不在本系统范围内：操作员先在带
/// `--remote-debugging-port` 的浏览器里完成登录，这里只接管会话。
/// 如果已有标签页打开了平台页面就复用它，否则新建并导航
pub async fn connect_to_browser_and_page(
    port: u16,
    platform_url: &str,
) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);
    debug!("平台 URL: {}", platform_url);

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

    // 查找已打开的平台页面（操作员可能已经停在导入页上）
    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            debug!("检查页面: {}", url);
            if url.starts_with(platform_url) {
                info!("✓ 复用已打开的平台页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    // 没有找到，创建新页面并导航
    debug!("未找到平台页面，将创建新页面");
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        e
    })?;
    page.goto(platform_url).await.map_err(|e| {
        error!("导航到 {} 失败: {}", platform_url, e);
        e
    })?;
    info!("已导航到: {}", platform_url);
    debug!("页面导航成功");

    Ok((browser, page))
}
