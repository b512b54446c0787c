use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "crawler.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时处理的筛选分类数量
    pub max_concurrent_filters: usize,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 试卷列表页 URL
    pub list_url: String,
    /// JSON 与图片输出目录
    pub output_dir: String,
    /// 日志目录
    pub log_dir: String,
    /// 解析页轮询次数
    pub poll_max_attempts: usize,
    /// 为 true 时自行启动浏览器，否则连接已登录的浏览器
    pub launch_browser: bool,
    /// 启动浏览器时使用的用户数据目录（保存登录状态）
    pub user_data_dir: String,
    /// 浏览器可执行文件路径
    pub chrome_executable: Option<String>,
    /// 跳过手动登录确认
    pub skip_login_prompt: bool,
    /// 名称包含该关键字的分类不抓取
    pub skip_filter_keyword: String,
    // --- 超时配置（毫秒） ---
    pub navigation_timeout_ms: u64,
    pub list_wait_timeout_ms: u64,
    pub analysis_wait_timeout_ms: u64,
    pub unknown_state_wait_ms: u64,
    pub container_wait_timeout_ms: u64,
    pub filters_wait_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_filters: 3,
            browser_debug_port: 9222,
            list_url: "https://www.fenbi.com/spa/tiku/guide/realTest/xingce/xingce".to_string(),
            output_dir: "downloads".to_string(),
            log_dir: "logs".to_string(),
            poll_max_attempts: 10,
            launch_browser: false,
            user_data_dir: "user_data".to_string(),
            chrome_executable: None,
            skip_login_prompt: false,
            skip_filter_keyword: "推荐".to_string(),
            navigation_timeout_ms: 10_000,
            list_wait_timeout_ms: 10_000,
            analysis_wait_timeout_ms: 30_000,
            unknown_state_wait_ms: 5_000,
            container_wait_timeout_ms: 30_000,
            filters_wait_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → 配置文件（可选）→ 环境变量
    pub fn load() -> Result<Self> {
        let path = std::env::var("CRAWLER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(Path::new(&path))?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置，缺失字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Self {
        let default = self;
        Self {
            max_concurrent_filters: env_parse("MAX_CONCURRENT_FILTERS").unwrap_or(default.max_concurrent_filters),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").unwrap_or(default.browser_debug_port),
            list_url: std::env::var("LIST_URL").unwrap_or(default.list_url),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            log_dir: std::env::var("LOG_DIR").unwrap_or(default.log_dir),
            poll_max_attempts: env_parse("POLL_MAX_ATTEMPTS").unwrap_or(default.poll_max_attempts),
            launch_browser: env_parse("LAUNCH_BROWSER").unwrap_or(default.launch_browser),
            user_data_dir: std::env::var("USER_DATA_DIR").unwrap_or(default.user_data_dir),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            skip_login_prompt: env_parse("SKIP_LOGIN_PROMPT").unwrap_or(default.skip_login_prompt),
            skip_filter_keyword: std::env::var("SKIP_FILTER_KEYWORD").unwrap_or(default.skip_filter_keyword),
            ..default
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn list_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.list_wait_timeout_ms)
    }

    pub fn analysis_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_wait_timeout_ms)
    }

    pub fn unknown_state_wait(&self) -> Duration {
        Duration::from_millis(self.unknown_state_wait_ms)
    }

    pub fn container_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.container_wait_timeout_ms)
    }

    pub fn filters_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.filters_wait_timeout_ms)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
