//! 列表页操作

use tracing::{debug, info, warn};

use super::selectors::{
    ACTIVE_CLASS, BODY_TEXT_JS, FILTER_ITEM, PAPER_ITEM, PAPER_TITLE,
};
use super::NavSettings;
use crate::error::{CrawlerError, Result};
use crate::infrastructure::{BrowsingSurface, ElementHandle, LoadState, SelectorState};
use crate::models::{FilterCategory, PaperRef};
use crate::utils::logging::{log_filters_found, truncate_text};

/// 回到列表页并确保分类处于激活状态
///
/// 失败只记录日志，调用方随后会重新等待列表。
pub async fn reset_to_list<S: BrowsingSurface>(
    surface: &S,
    filter: &FilterCategory,
    settings: &NavSettings,
) {
    if let Err(e) = try_reset(surface, filter, settings).await {
        warn!("[{}] 返回列表页失败: {}", filter, e);
    }
}

async fn try_reset<S: BrowsingSurface>(
    surface: &S,
    filter: &FilterCategory,
    settings: &NavSettings,
) -> Result<()> {
    let url = surface.current_url().await.unwrap_or_default();
    if !url.starts_with(&settings.list_url) {
        debug!("[{}] 当前不在列表页 ({})，重新导航", filter, url);
        surface.navigate(&settings.list_url).await?;
        if let Err(e) = surface
            .wait_for_load(LoadState::Load, settings.navigation_timeout)
            .await
        {
            debug!("[{}] 等待列表页加载超时，继续: {}", filter, e);
        }
    }

    let chips = surface.query(FILTER_ITEM).await?;
    for chip in chips {
        let text = chip.text().await.unwrap_or_default();
        if text.trim() != filter.name {
            continue;
        }
        let class = chip.attribute("class").await?.unwrap_or_default();
        if !class.split_whitespace().any(|c| c == ACTIVE_CLASS) {
            settings.pacing.before_filter_click.wait().await;
            chip.click().await?;
            debug!("[{}] 重新激活分类", filter);
            settings.pacing.after_filter_click.wait().await;
        }
        return Ok(());
    }

    Err(CrawlerError::ElementNotFound(format!(
        "{} ({})",
        FILTER_ITEM, filter.name
    )))
}

/// 读取所有分类，跳过名称包含 `skip_keyword` 的分类
///
/// 分类标签始终没有出现时返回错误，并记录当前页面信息便于排查（通常是未登录）。
pub async fn discover_filters<S: BrowsingSurface>(
    surface: &S,
    settings: &NavSettings,
    skip_keyword: &str,
) -> Result<Vec<FilterCategory>> {
    info!("🔍 正在读取分类列表...");
    if let Err(e) = surface
        .wait_for_selector(FILTER_ITEM, SelectorState::Attached, settings.filters_wait_timeout)
        .await
    {
        let url = surface.current_url().await.unwrap_or_default();
        let body = surface
            .evaluate(BODY_TEXT_JS)
            .await
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        warn!("❌ 未找到分类标签，当前页面: {}", url);
        warn!("页面内容: {}", truncate_text(&body, 200));
        return Err(e);
    }

    let mut names = Vec::new();
    let mut skipped = Vec::new();
    for chip in surface.query(FILTER_ITEM).await? {
        let name = chip.text().await.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            continue;
        }
        if !skip_keyword.is_empty() && name.contains(skip_keyword) {
            skipped.push(name);
        } else if !names.contains(&name) {
            names.push(name);
        }
    }

    log_filters_found(&names, &skipped);
    Ok(names.into_iter().map(FilterCategory::new).collect())
}

/// 等待试卷列表出现
pub async fn wait_for_papers<S: BrowsingSurface>(surface: &S, settings: &NavSettings) -> bool {
    surface
        .wait_for_selector(PAPER_ITEM, SelectorState::Attached, settings.list_wait_timeout)
        .await
        .is_ok()
}

pub async fn count_papers<S: BrowsingSurface>(surface: &S) -> Result<usize> {
    Ok(surface.query(PAPER_ITEM).await?.len())
}

/// 按下标读取试卷；下标越界（列表已变化）时返回 None
pub async fn paper_at<S: BrowsingSurface>(surface: &S, index: usize) -> Result<Option<PaperRef>> {
    let Some(row) = surface.query(PAPER_ITEM).await?.into_iter().nth(index) else {
        return Ok(None);
    };
    let title = row.child_text(PAPER_TITLE).await.ok().flatten();
    Ok(Some(PaperRef::new(index, title)))
}
