//! 浏览能力接口
//!
//! 上层（导航、抽取、编排）只依赖这里的 trait，不直接接触 chromiumoxide。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{CrawlerError, Result};

/// `wait_for_selector` 的轮询间隔
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 页面加载阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    DomContentLoaded,
    Load,
}

impl LoadState {
    /// `document.readyState` 是否已达到该阶段
    pub fn is_reached(&self, ready_state: &str) -> bool {
        match self {
            LoadState::DomContentLoaded => matches!(ready_state, "interactive" | "complete"),
            LoadState::Load => ready_state == "complete",
        }
    }
}

/// 等待元素的条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// 出现在 DOM 中即可
    Attached,
    /// 出现且可见
    Visible,
}

/// 页面元素句柄
///
/// 句柄可能随页面重新渲染而失效，失效后的调用返回错误。
#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn text(&self) -> Result<String>;

    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    async fn is_visible(&self) -> Result<bool>;

    async fn click(&self) -> Result<()>;

    /// 第一个匹配的后代元素的文字
    async fn child_text(&self, selector: &str) -> Result<Option<String>>;
}

/// 浏览页面（一个标签页）
#[async_trait]
pub trait BrowsingSurface: Send + Sync {
    type Element: ElementHandle + 'static;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn reload(&self) -> Result<()>;

    /// 等待页面加载到指定阶段，超时返回 [`CrawlerError::Timeout`]
    async fn wait_for_load(&self, state: LoadState, timeout: Duration) -> Result<()>;

    async fn query(&self, selector: &str) -> Result<Vec<Self::Element>>;

    async fn query_one(&self, selector: &str) -> Result<Option<Self::Element>> {
        Ok(self.query(selector).await?.into_iter().next())
    }

    async fn evaluate(&self, script: &str) -> Result<JsonValue>;

    async fn current_url(&self) -> Result<String>;

    /// 释放页面
    async fn close(&self) -> Result<()>;

    /// 轮询等待元素出现
    async fn wait_for_selector(
        &self,
        selector: &str,
        state: SelectorState,
        timeout: Duration,
    ) -> Result<Self::Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.query_one(selector).await {
                Ok(Some(element)) => {
                    let ready = match state {
                        SelectorState::Attached => true,
                        SelectorState::Visible => element.is_visible().await.unwrap_or(false),
                    };
                    if ready {
                        return Ok(element);
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("查询 {} 失败，继续等待: {}", selector, e),
            }

            if Instant::now() >= deadline {
                return Err(CrawlerError::timeout(selector, timeout.as_millis() as u64));
            }
            sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }
}

/// 为每个筛选任务提供独立页面
#[async_trait]
pub trait SurfaceProvider: Send + Sync {
    type Surface: BrowsingSurface + 'static;
    type Fetcher: AssetFetcher + 'static;

    async fn open_surface(&self) -> Result<Self::Surface>;

    /// 与页面共享登录状态的下载器
    async fn session_fetcher(&self, surface: &Self::Surface) -> Result<Self::Fetcher>;
}

/// 下载响应
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 资源下载能力
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_state_against_ready_state() {
        assert!(!LoadState::DomContentLoaded.is_reached("loading"));
        assert!(LoadState::DomContentLoaded.is_reached("interactive"));
        assert!(LoadState::DomContentLoaded.is_reached("complete"));

        assert!(!LoadState::Load.is_reached("loading"));
        assert!(!LoadState::Load.is_reached("interactive"));
        assert!(LoadState::Load.is_reached("complete"));
    }

    #[test]
    fn test_fetch_response_success_range() {
        let ok = FetchResponse { status: 204, body: Vec::new() };
        let denied = FetchResponse { status: 403, body: Vec::new() };
        assert!(ok.is_success());
        assert!(!denied.is_success());
    }
}
