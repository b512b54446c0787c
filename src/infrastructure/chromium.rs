//! chromiumoxide 实现 - 基础设施层
//!
//! 持有 Page 资源，只暴露浏览能力，不认识题目和试卷

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Element, Page};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::fetcher::SessionFetcher;
use super::surface::{BrowsingSurface, ElementHandle, LoadState, SurfaceProvider};
use crate::error::{CrawlerError, Result};

/// 可见性判断脚本（在元素上调用）
const IS_VISIBLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

/// `document.readyState` 的轮询间隔
const READY_STATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 单个标签页
pub struct ChromiumSurface {
    page: Page,
}

impl ChromiumSurface {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }
}

#[async_trait]
impl BrowsingSurface for ChromiumSurface {
    type Element = ChromiumElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.page.reload().await?;
        Ok(())
    }

    async fn wait_for_load(&self, state: LoadState, timeout: Duration) -> Result<()> {
        debug!("等待页面加载 ({:?})", state);
        let reached = async {
            if state == LoadState::Load {
                self.page.wait_for_navigation().await?;
            }
            // 导航事件之后仍以 readyState 为准
            loop {
                let ready_state = self.evaluate("document.readyState").await?;
                if state.is_reached(ready_state.as_str().unwrap_or_default()) {
                    return Ok::<(), CrawlerError>(());
                }
                tokio::time::sleep(READY_STATE_POLL_INTERVAL).await;
            }
        };
        match tokio::time::timeout(timeout, reached).await {
            Ok(result) => result,
            Err(_) => Err(CrawlerError::timeout(
                format!("页面加载 {:?}", state),
                timeout.as_millis() as u64,
            )),
        }
    }

    async fn query(&self, selector: &str) -> Result<Vec<ChromiumElement>> {
        let elements = self.page.find_elements(selector).await?;
        Ok(elements.into_iter().map(ChromiumElement::new).collect())
    }

    async fn evaluate(&self, script: &str) -> Result<JsonValue> {
        let result = self.page.evaluate(script).await?;
        Ok(result.into_value()?)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}

/// 页面元素
pub struct ChromiumElement {
    element: Element,
}

impl ChromiumElement {
    fn new(element: Element) -> Self {
        Self { element }
    }
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn text(&self) -> Result<String> {
        Ok(self.element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.element.attribute(name).await?)
    }

    async fn is_visible(&self) -> Result<bool> {
        let returns = self.element.call_js_fn(IS_VISIBLE_JS, false).await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn click(&self) -> Result<()> {
        self.element.click().await?;
        Ok(())
    }

    async fn child_text(&self, selector: &str) -> Result<Option<String>> {
        let children = self.element.find_elements(selector).await?;
        match children.first() {
            Some(child) => Ok(child.inner_text().await?),
            None => Ok(None),
        }
    }
}

/// 在同一个浏览器（同一登录会话）里为每个任务开新标签页
pub struct ChromiumProvider {
    browser: Arc<Browser>,
    start_url: String,
}

impl ChromiumProvider {
    pub fn new(browser: Arc<Browser>, start_url: impl Into<String>) -> Self {
        Self {
            browser,
            start_url: start_url.into(),
        }
    }
}

#[async_trait]
impl SurfaceProvider for ChromiumProvider {
    type Surface = ChromiumSurface;
    type Fetcher = SessionFetcher;

    async fn open_surface(&self) -> Result<ChromiumSurface> {
        let page = self
            .browser
            .new_page(self.start_url.as_str())
            .await
            .map_err(|e| CrawlerError::Browser(format!("创建页面失败: {}", e)))?;
        Ok(ChromiumSurface::new(page))
    }

    async fn session_fetcher(&self, surface: &ChromiumSurface) -> Result<SessionFetcher> {
        SessionFetcher::from_page(surface.page()).await
    }
}
