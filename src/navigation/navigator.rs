//! 单张试卷的导航状态机
//!
//! ```text
//! AtList → Entering(持锁) → OnExamPage → Submitted → Confirming → OnAnalysisPage
//!                         ↘ OnAnalysisPage（已做过的试卷）
//!                         ↘ Unknown → OnAnalysisPage | Stuck
//! ```
//!
//! 导航锁只覆盖"点击进入试卷"这一段，其余步骤不持锁。
//! 无论结果如何，调用方都要在之后回到列表页。

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::selectors::{
    ANALYSIS_URL_MARKER, CONFIRM_BUTTON, PAPER_ITEM, SOLUTION_TITLE, SUBMIT_BUTTON,
};
use super::NavSettings;
use crate::error::{CrawlerError, Result};
use crate::infrastructure::{BrowsingSurface, ElementHandle, LoadState, SelectorState};
use crate::models::PaperRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    AtList,
    Entering,
    OnExamPage,
    Submitted,
    Confirming,
    OnAnalysisPage,
    /// 既没有交卷按钮也没有解析标记
    Unknown,
    /// 无法继续（交卷按钮不可用、确认后未跳转等）
    Stuck,
}

/// 导航经过的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavOutcome {
    pub trail: Vec<NavState>,
}

impl NavOutcome {
    pub fn final_state(&self) -> NavState {
        self.trail.last().copied().unwrap_or(NavState::AtList)
    }

    pub fn reached_analysis(&self) -> bool {
        self.final_state() == NavState::OnAnalysisPage
    }
}

pub struct PaperNavigator<'a, S: BrowsingSurface> {
    surface: &'a S,
    settings: &'a NavSettings,
    nav_lock: &'a Mutex<()>,
}

impl<'a, S: BrowsingSurface> PaperNavigator<'a, S> {
    pub fn new(surface: &'a S, settings: &'a NavSettings, nav_lock: &'a Mutex<()>) -> Self {
        Self {
            surface,
            settings,
            nav_lock,
        }
    }

    /// 从列表页进入试卷并走到解析页
    pub async fn navigate_to_analysis(&self, paper: &PaperRef) -> NavOutcome {
        let mut trail = vec![NavState::AtList];

        trail.push(NavState::Entering);
        if let Err(e) = self.enter(paper).await {
            warn!("进入试卷《{}》失败: {}", paper.title, e);
            trail.push(NavState::Stuck);
            return NavOutcome { trail };
        }
        self.settings.pacing.after_enter.wait().await;

        if let Err(e) = self.inspect(&mut trail).await {
            warn!("检查《{}》页面状态失败: {}", paper.title, e);
            if trail.last() != Some(&NavState::Stuck) {
                trail.push(NavState::Stuck);
            }
        }

        debug!("《{}》导航轨迹: {:?}", paper.title, trail);
        NavOutcome { trail }
    }

    /// 持锁点击试卷行，并等待跳转
    async fn enter(&self, paper: &PaperRef) -> Result<()> {
        let _guard = self.nav_lock.lock().await;
        self.settings.pacing.before_enter.wait().await;

        let row = self.locate_row(paper.index).await?;
        row.click().await?;
        info!("🖱️ 已点击试卷《{}》", paper.title);

        // 跳转超时不致命，后面会检查页面状态
        if let Err(e) = self
            .surface
            .wait_for_load(LoadState::Load, self.settings.navigation_timeout)
            .await
        {
            debug!("等待跳转超时，继续检查页面: {}", e);
        }
        Ok(())
    }

    /// 按下标重新查询试卷行；不可见时再查询一次
    async fn locate_row(&self, index: usize) -> Result<S::Element> {
        let not_found = || CrawlerError::ElementNotFound(format!("{}[{}]", PAPER_ITEM, index));

        let row = self
            .surface
            .query(PAPER_ITEM)
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(not_found)?;
        if row.is_visible().await.unwrap_or(false) {
            return Ok(row);
        }

        debug!("试卷行 {} 已失效，重新查询", index);
        self.surface
            .query(PAPER_ITEM)
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(not_found)
    }

    async fn inspect(&self, trail: &mut Vec<NavState>) -> Result<()> {
        if let Some(submit) = self.surface.query_one(SUBMIT_BUTTON).await? {
            if !submit.is_visible().await.unwrap_or(false) {
                warn!("交卷按钮不可见");
                trail.push(NavState::Stuck);
                return Ok(());
            }
            trail.push(NavState::OnExamPage);
            self.settings.pacing.before_submit.wait().await;
            submit.click().await?;
            trail.push(NavState::Submitted);
            debug!("已点击交卷，等待确认按钮");

            let confirm = match self
                .surface
                .wait_for_selector(
                    CONFIRM_BUTTON,
                    SelectorState::Visible,
                    self.settings.analysis_wait_timeout,
                )
                .await
            {
                Ok(confirm) => confirm,
                Err(e) => {
                    warn!("确认按钮未出现: {}", e);
                    trail.push(NavState::Stuck);
                    return Ok(());
                }
            };
            self.settings.pacing.before_confirm.wait().await;
            confirm.click().await?;
            trail.push(NavState::Confirming);

            let reached = self.wait_for_analysis().await;
            trail.push(if reached {
                NavState::OnAnalysisPage
            } else {
                NavState::Stuck
            });
            return Ok(());
        }

        if self.url_has_marker().await || self.surface.query_one(SOLUTION_TITLE).await?.is_some() {
            info!("📖 试卷已完成过，直接进入解析页");
            trail.push(NavState::OnAnalysisPage);
            return Ok(());
        }

        trail.push(NavState::Unknown);
        let reached = self
            .surface
            .wait_for_selector(
                SOLUTION_TITLE,
                SelectorState::Attached,
                self.settings.unknown_state_wait,
            )
            .await
            .is_ok();
        if !reached {
            warn!("页面状态未知，放弃本试卷");
        }
        trail.push(if reached {
            NavState::OnAnalysisPage
        } else {
            NavState::Stuck
        });
        Ok(())
    }

    /// 等待解析标记，超时后退回检查 URL
    async fn wait_for_analysis(&self) -> bool {
        match self
            .surface
            .wait_for_selector(
                SOLUTION_TITLE,
                SelectorState::Attached,
                self.settings.analysis_wait_timeout,
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!("解析标记未出现 ({})，检查 URL", e);
                self.url_has_marker().await
            }
        }
    }

    async fn url_has_marker(&self) -> bool {
        self.surface
            .current_url()
            .await
            .map(|url| url.contains(ANALYSIS_URL_MARKER))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake::{Blueprint, FakePaper, FakeSurface, Opens, LIST_URL};
    use NavState::*;

    async fn navigate(opens: Opens) -> (NavOutcome, FakeSurface) {
        let blueprint = Blueprint::new(&["国考"], vec![FakePaper::new("试卷", opens)]);
        let surface = FakeSurface::at_list(&blueprint);
        let settings = NavSettings::for_tests(LIST_URL);
        let lock = Mutex::new(());

        let outcome = PaperNavigator::new(&surface, &settings, &lock)
            .navigate_to_analysis(&PaperRef::new(0, Some("试卷".to_string())))
            .await;
        (outcome, surface)
    }

    #[tokio::test]
    async fn test_exam_page_submits_and_confirms() {
        let (outcome, surface) = navigate(Opens::Exam {
            submit_visible: true,
            confirm_works: true,
        })
        .await;

        assert_eq!(
            outcome.trail,
            vec![AtList, Entering, OnExamPage, Submitted, Confirming, OnAnalysisPage]
        );
        assert!(outcome.reached_analysis());
        assert_eq!(surface.clicks(), vec!["paper:0", "submit", "confirm"]);
    }

    #[tokio::test]
    async fn test_completed_paper_skips_submission() {
        let (outcome, surface) = navigate(Opens::Analysis).await;

        assert_eq!(outcome.trail, vec![AtList, Entering, OnAnalysisPage]);
        assert_eq!(surface.clicks(), vec!["paper:0"]);
    }

    #[tokio::test]
    async fn test_invisible_submit_is_stuck() {
        let (outcome, surface) = navigate(Opens::Exam {
            submit_visible: false,
            confirm_works: true,
        })
        .await;

        assert_eq!(outcome.trail, vec![AtList, Entering, Stuck]);
        assert!(!outcome.reached_analysis());
        assert_eq!(surface.clicks(), vec!["paper:0"]);
    }

    #[tokio::test]
    async fn test_confirm_without_redirect_is_stuck() {
        let (outcome, _) = navigate(Opens::Exam {
            submit_visible: true,
            confirm_works: false,
        })
        .await;

        assert_eq!(
            outcome.trail,
            vec![AtList, Entering, OnExamPage, Submitted, Confirming, Stuck]
        );
    }

    #[tokio::test]
    async fn test_unknown_state_recovers_after_wait() {
        let (outcome, _) = navigate(Opens::LateAnalysis).await;
        assert_eq!(outcome.trail, vec![AtList, Entering, Unknown, OnAnalysisPage]);
    }

    #[tokio::test]
    async fn test_unknown_state_exhausted_is_stuck() {
        let (outcome, _) = navigate(Opens::Blank).await;
        assert_eq!(outcome.trail, vec![AtList, Entering, Unknown, Stuck]);
        assert_eq!(outcome.final_state(), Stuck);
    }

    #[tokio::test]
    async fn test_missing_row_is_stuck() {
        let blueprint = Blueprint::new(&["国考"], vec![]);
        let surface = FakeSurface::at_list(&blueprint);
        let settings = NavSettings::for_tests(LIST_URL);
        let lock = Mutex::new(());

        let outcome = PaperNavigator::new(&surface, &settings, &lock)
            .navigate_to_analysis(&PaperRef::new(3, None))
            .await;
        assert_eq!(outcome.trail, vec![AtList, Entering, Stuck]);
        assert!(surface.clicks().is_empty());
    }
}
