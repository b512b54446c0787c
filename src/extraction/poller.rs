//! 解析页轮询
//!
//! 解析内容在跳转后异步填充。每次重新读取整页容器、重新解析，
//! 直到至少一道题带有解析，或重试次数用完（返回空列表）。

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::extractor::parse_items;
use crate::error::{CrawlerError, Result};
use crate::infrastructure::BrowsingSurface;
use crate::models::ExtractionItem;
use crate::utils::DelayRange;

/// 读取题目列表容器（不存在时读取 body）
const READ_CONTAINER_JS: &str = r#"(() => {
    const container = document.querySelector('.tis-container');
    return container ? container.outerHTML : document.body.outerHTML;
})()"#;

/// 读取当前页面的容器 HTML，每次调用都必须是最新内容
#[async_trait]
pub trait ContainerReader: Send + Sync {
    async fn read_container(&self) -> Result<String>;
}

/// 从浏览页面读取
pub struct SurfaceContainerReader<'a, S: BrowsingSurface> {
    surface: &'a S,
}

impl<'a, S: BrowsingSurface> SurfaceContainerReader<'a, S> {
    pub fn new(surface: &'a S) -> Self {
        Self { surface }
    }
}

#[async_trait]
impl<S: BrowsingSurface> ContainerReader for SurfaceContainerReader<'_, S> {
    async fn read_container(&self) -> Result<String> {
        let value = self.surface.evaluate(READ_CONTAINER_JS).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CrawlerError::Script("容器脚本没有返回字符串".to_string()))
    }
}

/// 至少有一个条目，且至少一道题的解析非空
pub fn is_complete(items: &[ExtractionItem]) -> bool {
    !items.is_empty()
        && items
            .iter()
            .flat_map(|item| item.questions())
            .any(|q| q.has_analysis())
}

/// 抽取轮询器
#[derive(Debug, Clone)]
pub struct ExtractionPoller {
    max_attempts: usize,
    retry_delay: DelayRange,
}

impl ExtractionPoller {
    pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

    pub fn new(max_attempts: usize, retry_delay: DelayRange) -> Self {
        Self {
            max_attempts,
            retry_delay,
        }
    }

    /// 轮询直到内容完整；用尽次数返回空列表
    pub async fn poll<R: ContainerReader + ?Sized>(&self, reader: &R) -> Vec<ExtractionItem> {
        for attempt in 1..=self.max_attempts {
            match reader.read_container().await {
                Ok(markup) => {
                    let items = parse_items(&markup);
                    if is_complete(&items) {
                        let total: usize = items.iter().map(|i| i.questions().len()).sum();
                        info!(
                            "✓ 抽取成功: {} 个条目（共 {} 道题），解析已加载",
                            items.len(),
                            total
                        );
                        return items;
                    }
                    debug!(
                        "第 {}/{} 次抽取: {} 个条目，解析尚未完整",
                        attempt,
                        self.max_attempts,
                        items.len()
                    );
                }
                Err(e) => warn!("第 {}/{} 次读取容器失败: {}", attempt, self.max_attempts, e),
            }

            if attempt < self.max_attempts {
                self.retry_delay.wait().await;
            }
        }

        warn!("⚠️ {} 次尝试后解析仍不完整，放弃本试卷", self.max_attempts);
        Vec::new()
    }
}

impl Default for ExtractionPoller {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, DelayRange::millis(2000, 4000))
    }
}
