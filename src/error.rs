use thiserror::Error;

/// 爬虫错误类型
///
/// 基础设施层（浏览器、网络、文件）只返回这个类型，
/// 编排层再用 anyhow 包装上下文。
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// 浏览器连接 / 启动 / 页面创建失败
    #[error("浏览器错误: {0}")]
    Browser(String),

    /// CDP 协议调用失败
    #[error("CDP 调用失败: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// 有界等待超时（导航、选择器、下载）
    #[error("等待超时 ({what}, {millis}ms)")]
    Timeout { what: String, millis: u64 },

    /// 选择器没有匹配到元素
    #[error("未找到元素: {0}")]
    ElementNotFound(String),

    /// 页面脚本返回了无法使用的结果
    #[error("脚本执行失败: {0}")]
    Script(String),

    /// HTTP 请求失败
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("文件操作错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("配置文件解析失败: {0}")]
    Config(#[from] toml::de::Error),
}

impl CrawlerError {
    /// 创建超时错误
    pub fn timeout(what: impl Into<String>, millis: u64) -> Self {
        CrawlerError::Timeout {
            what: what.into(),
            millis,
        }
    }

    /// 是否为超时（可恢复信号）
    pub fn is_timeout(&self) -> bool {
        matches!(self, CrawlerError::Timeout { .. })
    }
}

/// 爬虫结果类型
pub type Result<T> = std::result::Result<T, CrawlerError>;
