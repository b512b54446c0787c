//! 单张试卷处理器 - 编排层
//!
//! ## 职责
//!
//! 处理列表中的一张试卷：
//!
//! 1. **导航**：委托 `PaperNavigator` 从列表页走到解析页
//! 2. **抽取**：等待题目容器，再用 `ExtractionPoller` 轮询直到解析加载完成
//! 3. **图片**：委托 `AssetResolver` 下载图片并改写引用
//! 4. **落盘**：交给 `JsonStore`
//!
//! 返回列表页不在这里做，由分类任务在每张试卷之后统一执行。

use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::assets::AssetResolver;
use crate::extraction::{ExtractionPoller, SurfaceContainerReader};
use crate::infrastructure::{AssetFetcher, BrowsingSurface, SelectorState};
use crate::models::{ExtractionResult, FilterCategory, PaperRef};
use crate::navigation::selectors::QUESTION_CONTAINER;
use crate::navigation::{NavSettings, PaperNavigator};
use crate::storage::JsonStore;

/// 试卷处理上下文
///
/// 封装"我正在处理哪个分类的第几张卷子"
#[derive(Debug, Clone)]
pub struct PaperCtx {
    pub filter: String,
    /// 列表中的位置（从 0 开始）
    pub index: usize,
    pub total: usize,
    pub title: String,
}

impl PaperCtx {
    pub fn new(filter: &FilterCategory, paper: &PaperRef, total: usize) -> Self {
        Self {
            filter: filter.name.clone(),
            index: paper.index,
            total,
            title: paper.title.clone(),
        }
    }
}

impl Display for PaperCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] [{}/{}] 《{}》",
            self.filter,
            self.index + 1,
            self.total,
            self.title
        )
    }
}

/// 单张试卷的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperOutcome {
    Saved(PathBuf),
    Skipped(String),
}

/// 单张试卷处理器，同一分类任务内复用
pub struct PaperProcessor<'a, S: BrowsingSurface, F: AssetFetcher> {
    pub surface: &'a S,
    pub fetcher: &'a F,
    pub settings: &'a NavSettings,
    pub nav_lock: &'a Mutex<()>,
    pub store: &'a JsonStore,
    pub poller: ExtractionPoller,
    pub resolver: AssetResolver,
    pub container_wait: Duration,
}

impl<'a, S: BrowsingSurface, F: AssetFetcher> PaperProcessor<'a, S, F> {
    /// 处理一张试卷
    ///
    /// # 返回
    /// 未到达解析页或解析不完整时返回 `Skipped`，不写文件
    pub async fn process(&self, ctx: &PaperCtx, paper: &PaperRef) -> Result<PaperOutcome> {
        info!("{} 开始处理", ctx);

        let outcome = PaperNavigator::new(self.surface, self.settings, self.nav_lock)
            .navigate_to_analysis(paper)
            .await;
        if !outcome.reached_analysis() {
            warn!("{} ⚠️ 未能进入解析页 ({:?})", ctx, outcome.final_state());
            return Ok(PaperOutcome::Skipped(format!(
                "未进入解析页: {:?}",
                outcome.final_state()
            )));
        }

        self.settings.pacing.analysis_settle.wait().await;
        if let Err(e) = self
            .surface
            .wait_for_selector(QUESTION_CONTAINER, SelectorState::Attached, self.container_wait)
            .await
        {
            warn!("{} ⚠️ 题目容器未出现: {}", ctx, e);
            return Ok(PaperOutcome::Skipped("题目容器未出现".to_string()));
        }

        let reader = SurfaceContainerReader::new(self.surface);
        let items = self.poller.poll(&reader).await;
        if items.is_empty() {
            warn!("{} ⚠️ 解析未加载完成，跳过", ctx);
            return Ok(PaperOutcome::Skipped("解析不完整".to_string()));
        }

        let image_dir = self.store.image_dir(&ctx.title);
        let items = self.resolver.resolve(items, &image_dir, self.fetcher).await;

        let result = ExtractionResult {
            title: ctx.title.clone(),
            filter: ctx.filter.clone(),
            items,
        };
        let path = self
            .store
            .save(&result)
            .await
            .with_context(|| format!("{} 保存失败", ctx))?;

        info!("{} ✅ 完成，共 {} 道题", ctx, result.question_count());
        Ok(PaperOutcome::Saved(path))
    }
}
