//! 会话内下载器
//!
//! 复用浏览器页面的 Cookie 与 User-Agent，让图片请求与页面处于同一登录会话。

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use reqwest::header::{COOKIE, REFERER, USER_AGENT};
use tracing::debug;

use super::surface::{AssetFetcher, FetchResponse};
use crate::error::Result;

/// 单次下载超时
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SessionFetcher {
    client: reqwest::Client,
    cookie_header: String,
    user_agent: Option<String>,
    referer: Option<String>,
}

impl SessionFetcher {
    pub fn new(cookie_header: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            cookie_header: cookie_header.into(),
            user_agent: None,
            referer: None,
        })
    }

    /// 从页面读取当前会话的 Cookie / UA / 来源页
    pub async fn from_page(page: &Page) -> Result<Self> {
        let cookies = page.get_cookies().await?;
        let cookie_header = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        debug!("会话 Cookie 数量: {}", cookies.len());

        let user_agent: Option<String> = page
            .evaluate("navigator.userAgent")
            .await
            .ok()
            .and_then(|v| v.into_value().ok());
        let referer = page.url().await.ok().flatten();

        let mut fetcher = Self::new(cookie_header)?;
        fetcher.user_agent = user_agent;
        fetcher.referer = referer;
        Ok(fetcher)
    }
}

#[async_trait]
impl AssetFetcher for SessionFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        let mut request = self.client.get(url);
        if !self.cookie_header.is_empty() {
            request = request.header(COOKIE, &self.cookie_header);
        }
        if let Some(ua) = &self.user_agent {
            request = request.header(USER_AGENT, ua);
        }
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(FetchResponse { status, body })
    }
}
