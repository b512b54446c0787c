//! 分类任务 - 编排层
//!
//! 一个分类对应一个任务、一个独立页面。任务体受并发闸门限制，
//! 点击进入试卷的那一段再受全局导航锁限制。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info, warn};

use super::paper_processor::{PaperCtx, PaperOutcome, PaperProcessor};
use crate::assets::AssetResolver;
use crate::extraction::ExtractionPoller;
use crate::infrastructure::{BrowsingSurface, SurfaceProvider};
use crate::models::FilterCategory;
use crate::navigation::{count_papers, paper_at, reset_to_list, wait_for_papers, NavSettings};
use crate::storage::JsonStore;

/// 任务之间共享的协调对象
#[derive(Debug, Clone)]
pub struct Coordination {
    /// 同时运行的分类任务上限
    pub gate: Arc<Semaphore>,
    /// 进入试卷时的全局互斥
    pub nav_lock: Arc<Mutex<()>>,
}

impl Coordination {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(max_concurrent.max(1))),
            nav_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// 分类任务统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TaskStats {
    pub fn merge(&mut self, other: TaskStats) {
        self.saved += other.saved;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// 所有分类任务共用的设置
#[derive(Debug, Clone)]
pub struct TaskSettings {
    pub nav: NavSettings,
    pub poll_max_attempts: usize,
    pub container_wait: Duration,
}

pub struct FilterTask<P: SurfaceProvider> {
    pub filter: FilterCategory,
    pub provider: Arc<P>,
    pub coordination: Coordination,
    pub settings: Arc<TaskSettings>,
    pub store: Arc<JsonStore>,
}

impl<P: SurfaceProvider> FilterTask<P> {
    /// 运行任务；任何错误都在这里记录，不影响其他任务
    pub async fn run(self) -> TaskStats {
        let mut stats = TaskStats::default();

        let _permit = match Arc::clone(&self.coordination.gate).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("[{}] ❌ 无法获取并发许可: {}", self.filter, e);
                return stats;
            }
        };
        info!("[{}] 🚀 任务开始", self.filter);

        let surface = match self.provider.open_surface().await {
            Ok(surface) => surface,
            Err(e) => {
                error!("[{}] ❌ 打开页面失败: {}", self.filter, e);
                return stats;
            }
        };

        // panic 也要走到下面的关闭页面
        match AssertUnwindSafe(self.crawl(&surface, &mut stats))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("[{}] ❌ 任务异常结束: {:#}", self.filter, e),
            Err(_) => error!("[{}] ❌ 任务 panic，已中止", self.filter),
        }

        if let Err(e) = surface.close().await {
            warn!("[{}] 关闭页面失败: {}", self.filter, e);
        }

        info!(
            "[{}] 🏁 任务结束: 保存 {}, 跳过 {}, 失败 {}",
            self.filter, stats.saved, stats.skipped, stats.failed
        );
        stats
    }

    async fn crawl(&self, surface: &P::Surface, stats: &mut TaskStats) -> Result<()> {
        let nav = &self.settings.nav;
        let fetcher = self
            .provider
            .session_fetcher(surface)
            .await
            .context("创建下载器失败")?;

        reset_to_list(surface, &self.filter, nav).await;
        if !wait_for_papers(surface, nav).await {
            info!("[{}] 📭 没有找到试卷", self.filter);
            return Ok(());
        }

        let total = count_papers(surface).await.context("统计试卷数量失败")?;
        info!("[{}] 📋 共 {} 张试卷", self.filter, total);

        let processor = PaperProcessor {
            surface,
            fetcher: &fetcher,
            settings: nav,
            nav_lock: &self.coordination.nav_lock,
            store: &self.store,
            poller: ExtractionPoller::new(self.settings.poll_max_attempts, nav.pacing.poll_retry),
            resolver: AssetResolver::new(nav.pacing.between_fetches),
            container_wait: self.settings.container_wait,
        };

        for index in 0..total {
            if !wait_for_papers(surface, nav).await {
                reset_to_list(surface, &self.filter, nav).await;
                if !wait_for_papers(surface, nav).await {
                    warn!("[{}] ⚠️ 试卷列表消失，停止", self.filter);
                    break;
                }
            }

            let paper = match paper_at(surface, index).await {
                Ok(Some(paper)) => paper,
                Ok(None) => {
                    warn!("[{}] ⚠️ 列表已变化（第 {} 张不存在），停止", self.filter, index + 1);
                    break;
                }
                Err(e) => {
                    error!("[{}] ❌ 读取第 {} 张试卷失败: {}", self.filter, index + 1, e);
                    stats.failed += 1;
                    self.cooldown(surface).await;
                    continue;
                }
            };

            let ctx = PaperCtx::new(&self.filter, &paper, total);
            match processor.process(&ctx, &paper).await {
                Ok(PaperOutcome::Saved(_)) => stats.saved += 1,
                Ok(PaperOutcome::Skipped(reason)) => {
                    info!("{} ⏭️ 跳过: {}", ctx, reason);
                    stats.skipped += 1;
                }
                Err(e) => {
                    error!("{} ❌ 处理失败: {:#}", ctx, e);
                    stats.failed += 1;
                }
            }

            self.cooldown(surface).await;
        }

        Ok(())
    }

    /// 每张试卷之后：停顿、回到列表、再停顿
    async fn cooldown(&self, surface: &P::Surface) {
        let nav = &self.settings.nav;
        nav.pacing.after_paper.wait().await;
        reset_to_list(surface, &self.filter, nav).await;
        nav.pacing.after_reset.wait().await;
    }
}
