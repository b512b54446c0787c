//! 多分类并发处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源管理和分类任务的调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：连接或启动浏览器，打开列表页（带重试），等待手动登录
//! 2. **发现分类**：读取列表页的分类标签
//! 3. **并发控制**：每个分类一个任务，Semaphore 限制同时运行的数量，全局锁串行化进入试卷
//! 4. **全局统计**：汇总所有分类任务的结果
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有 Browser 的模块
//! - **故障隔离**：单个任务的 panic 或错误不影响其他任务

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::filter_task::{Coordination, FilterTask, TaskSettings, TaskStats};
use crate::browser;
use crate::config::Config;
use crate::infrastructure::{BrowsingSurface, ChromiumSurface, ChromiumProvider, LoadState, SurfaceProvider};
use crate::models::FilterCategory;
use crate::navigation::{discover_filters, NavSettings};
use crate::storage::JsonStore;
use crate::utils::logging::{log_startup, print_final_stats};
use crate::utils::Pacing;

/// 打开列表页的尝试次数
const BOOTSTRAP_ATTEMPTS: usize = 3;
/// 两次尝试之间的间隔
const BOOTSTRAP_RETRY_DELAY: Duration = Duration::from_secs(2);
/// 列表页所在站点
const SITE_MARKER: &str = "fenbi.com";

/// 应用主结构
pub struct App {
    config: Config,
    browser: Arc<Browser>,
    filters: Vec<FilterCategory>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(config.max_concurrent_filters, &config.list_url);

        let browser = if config.launch_browser {
            browser::launch_with_profile(&config.user_data_dir, config.chrome_executable.as_deref())
                .await?
        } else {
            browser::connect_to_browser(config.browser_debug_port).await?
        };
        let browser = Arc::new(browser);

        let page = browser
            .new_page("about:blank")
            .await
            .context("创建引导页面失败")?;
        let surface = ChromiumSurface::new(page);
        bootstrap(&surface, &config).await?;

        if !config.skip_login_prompt {
            wait_for_login().await?;
            surface.reload().await.context("刷新列表页失败")?;
            if let Err(e) = surface
                .wait_for_load(LoadState::Load, config.navigation_timeout())
                .await
            {
                warn!("刷新后等待加载超时: {}", e);
            }
        }

        let settings = NavSettings::new(&config, Pacing::default());
        let filters = discover_filters(&surface, &settings, &config.skip_filter_keyword).await;
        if let Err(e) = surface.close().await {
            warn!("关闭引导页面失败: {}", e);
        }
        let filters = filters.context("读取分类失败，请确认已登录")?;

        Ok(Self {
            config,
            browser,
            filters,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        if self.filters.is_empty() {
            warn!("⚠️ 没有需要处理的分类，程序结束");
            return Ok(());
        }

        let provider = ChromiumProvider::new(Arc::clone(&self.browser), "about:blank");
        let settings = TaskSettings {
            nav: NavSettings::new(&self.config, Pacing::default()),
            poll_max_attempts: self.config.poll_max_attempts,
            container_wait: self.config.container_wait_timeout(),
        };
        let store = JsonStore::new(&self.config.output_dir);

        let stats = run_filters(
            provider,
            self.filters.clone(),
            Coordination::new(self.config.max_concurrent_filters),
            settings,
            store,
        )
        .await;

        print_final_stats(stats.saved, stats.skipped, stats.failed, &self.config.output_dir);
        Ok(())
    }
}

/// 为每个分类启动一个任务并等待全部结束
pub async fn run_filters<P: SurfaceProvider + 'static>(
    provider: P,
    filters: Vec<FilterCategory>,
    coordination: Coordination,
    settings: TaskSettings,
    store: JsonStore,
) -> TaskStats {
    let provider = Arc::new(provider);
    let settings = Arc::new(settings);
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for filter in filters {
        let task = FilterTask {
            filter: filter.clone(),
            provider: Arc::clone(&provider),
            coordination: coordination.clone(),
            settings: Arc::clone(&settings),
            store: Arc::clone(&store),
        };
        handles.push((filter, tokio::spawn(task.run())));
    }

    let mut total = TaskStats::default();
    for (filter, handle) in handles {
        match handle.await {
            Ok(stats) => total.merge(stats),
            Err(e) => error!("[{}] 任务执行失败: {}", filter, e),
        }
    }
    total
}

/// 打开列表页，最多尝试三次；超时但已在站点内视为成功
async fn bootstrap<S: BrowsingSurface>(surface: &S, config: &Config) -> Result<()> {
    for attempt in 1..=BOOTSTRAP_ATTEMPTS {
        info!("🌐 打开列表页 (第 {}/{} 次)", attempt, BOOTSTRAP_ATTEMPTS);
        let result = match surface.navigate(&config.list_url).await {
            Ok(()) => {
                surface
                    .wait_for_load(LoadState::DomContentLoaded, config.navigation_timeout())
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => return Ok(()),
            Err(e) => {
                let url = surface.current_url().await.unwrap_or_default();
                if e.is_timeout() && url.contains(SITE_MARKER) {
                    warn!("等待加载超时，但已在站点内 ({})，继续", url);
                    return Ok(());
                }
                warn!("打开列表页失败: {}", e);
            }
        }

        if attempt < BOOTSTRAP_ATTEMPTS {
            sleep(BOOTSTRAP_RETRY_DELAY).await;
        }
    }
    anyhow::bail!("{} 次尝试后仍无法打开列表页", BOOTSTRAP_ATTEMPTS)
}

/// 等待用户在浏览器中完成登录后按回车
async fn wait_for_login() -> Result<()> {
    info!("{}", "=".repeat(60));
    info!("🔐 请在浏览器中完成登录，然后按回车继续...");
    info!("{}", "=".repeat(60));

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("读取输入失败")?;
    Ok(())
}
