//! 随机等待
//!
//! 所有“像人一样”的停顿都集中在这里，测试时用 [`Pacing::instant`] 关掉。

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

/// 闭区间内均匀随机的时长
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange::millis(0, 0);

    pub const fn millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    pub async fn wait(&self) {
        let duration = self.sample();
        if !duration.is_zero() {
            sleep(duration).await;
        }
    }
}

/// 各步骤的停顿
#[derive(Debug, Clone)]
pub struct Pacing {
    /// 重新点击分类前
    pub before_filter_click: DelayRange,
    /// 点击分类后等待列表刷新
    pub after_filter_click: DelayRange,
    /// 进入试卷前（在导航锁内）
    pub before_enter: DelayRange,
    /// 释放导航锁后等待页面稳定
    pub after_enter: DelayRange,
    pub before_submit: DelayRange,
    pub before_confirm: DelayRange,
    /// 到达解析页后等待内容填充
    pub analysis_settle: DelayRange,
    /// 抽取轮询的重试间隔
    pub poll_retry: DelayRange,
    /// 相邻两次图片下载之间
    pub between_fetches: DelayRange,
    /// 一张试卷结束后、返回列表前
    pub after_paper: DelayRange,
    /// 返回列表后
    pub after_reset: DelayRange,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            before_filter_click: DelayRange::millis(500, 1500),
            after_filter_click: DelayRange::millis(2000, 4000),
            before_enter: DelayRange::millis(1000, 2500),
            after_enter: DelayRange::millis(2000, 4000),
            before_submit: DelayRange::millis(500, 1500),
            before_confirm: DelayRange::millis(500, 1000),
            analysis_settle: DelayRange::millis(2000, 4000),
            poll_retry: DelayRange::millis(2000, 4000),
            between_fetches: DelayRange::millis(100, 400),
            after_paper: DelayRange::millis(1000, 1000),
            after_reset: DelayRange::millis(2000, 5000),
        }
    }
}

impl Pacing {
    /// 不等待（测试用）
    pub fn instant() -> Self {
        Self {
            before_filter_click: DelayRange::ZERO,
            after_filter_click: DelayRange::ZERO,
            before_enter: DelayRange::ZERO,
            after_enter: DelayRange::ZERO,
            before_submit: DelayRange::ZERO,
            before_confirm: DelayRange::ZERO,
            analysis_settle: DelayRange::ZERO,
            poll_retry: DelayRange::ZERO,
            between_fetches: DelayRange::ZERO,
            after_paper: DelayRange::ZERO,
            after_reset: DelayRange::ZERO,
        }
    }
}
