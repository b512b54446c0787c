//! 导航层
//!
//! 列表页操作（返回列表、枚举分类和试卷）与单张试卷的导航状态机。

pub mod list_page;
pub mod navigator;
pub mod selectors;

use std::time::Duration;

use crate::config::Config;
use crate::utils::Pacing;

pub use list_page::{count_papers, discover_filters, paper_at, reset_to_list, wait_for_papers};
pub use navigator::{NavOutcome, NavState, PaperNavigator};

/// 导航用到的地址、超时和停顿
#[derive(Debug, Clone)]
pub struct NavSettings {
    pub list_url: String,
    pub navigation_timeout: Duration,
    pub list_wait_timeout: Duration,
    pub analysis_wait_timeout: Duration,
    pub unknown_state_wait: Duration,
    pub filters_wait_timeout: Duration,
    pub pacing: Pacing,
}

impl NavSettings {
    pub fn new(config: &Config, pacing: Pacing) -> Self {
        Self {
            list_url: config.list_url.clone(),
            navigation_timeout: config.navigation_timeout(),
            list_wait_timeout: config.list_wait_timeout(),
            analysis_wait_timeout: config.analysis_wait_timeout(),
            unknown_state_wait: config.unknown_state_wait(),
            filters_wait_timeout: config.filters_wait_timeout(),
            pacing,
        }
    }

    /// 短超时、零停顿（测试用）
    #[cfg(test)]
    pub(crate) fn for_tests(list_url: &str) -> Self {
        Self {
            list_url: list_url.to_string(),
            navigation_timeout: Duration::from_millis(50),
            list_wait_timeout: Duration::from_millis(50),
            analysis_wait_timeout: Duration::from_millis(50),
            unknown_state_wait: Duration::from_millis(300),
            filters_wait_timeout: Duration::from_millis(50),
            pacing: Pacing::instant(),
        }
    }
}
