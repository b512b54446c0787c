//! 图片资源解析
//!
//! 收集一张试卷里所有图片地址，去重后下载到本地，
//! 再把文本里的地址替换成本地相对路径。文件名由 URL 字符串的摘要决定，
//! 已存在的文件不会重复下载，因此重复执行是安全的。

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::infrastructure::AssetFetcher;
use crate::models::{ExtractionItem, ImageRef, Question};
use crate::utils::DelayRange;

/// 无法推断扩展名时使用
const DEFAULT_EXTENSION: &str = "png";

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,4}$").expect("扩展名正则必须合法"));

/// 协议相对地址补全为 https；非 http(s) 地址返回 None
pub fn absolute_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with("//") {
        Some(format!("https:{}", raw))
    } else if raw.starts_with("https://") || raw.starts_with("http://") {
        Some(raw.to_string())
    } else {
        None
    }
}

/// `sha256(url).ext`
pub fn file_name_for(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{:x}.{}", digest, extension_of(url))
}

fn extension_of(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit_once('.') {
        Some((_, ext)) if EXTENSION_RE.is_match(ext) => ext,
        _ => DEFAULT_EXTENSION,
    }
}

/// 把文本中出现的每个已解析地址（含协议相对形式、HTML 转义形式）替换为本地路径
pub fn rewrite_links(text: &str, link_map: &BTreeMap<String, String>) -> String {
    if text.is_empty() || link_map.is_empty() {
        return text.to_string();
    }

    // 长地址先替换，避免被其前缀地址截断
    let mut entries: Vec<(&String, &String)> = link_map.iter().collect();
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut text = text.to_string();
    for (url, local) in entries {
        let mut forms = vec![url.clone()];
        if let Some(rest) = url.strip_prefix("https:") {
            forms.push(rest.to_string());
        }
        for form in forms {
            let escaped = form.replace('&', "&amp;");
            if text.contains(&form) {
                text = text.replace(&form, local);
            }
            if escaped != form && text.contains(&escaped) {
                text = text.replace(&escaped, local);
            }
        }
    }
    text
}

/// 图片资源解析器
#[derive(Debug, Clone)]
pub struct AssetResolver {
    fetch_delay: DelayRange,
}

impl AssetResolver {
    pub fn new(fetch_delay: DelayRange) -> Self {
        Self { fetch_delay }
    }

    /// 下载图片并改写引用
    ///
    /// # 参数
    /// - `items`: 抽取结果
    /// - `target_dir`: 图片目录，本地路径写作 `images/<目录名>/<文件名>`
    /// - `fetcher`: 下载能力
    ///
    /// # 返回
    /// 返回改写后的条目；下载失败的地址保持原样
    pub async fn resolve<F: AssetFetcher + ?Sized>(
        &self,
        mut items: Vec<ExtractionItem>,
        target_dir: &Path,
        fetcher: &F,
    ) -> Vec<ExtractionItem> {
        if let Err(e) = tokio::fs::create_dir_all(target_dir).await {
            warn!("无法创建图片目录 {}: {}", target_dir.display(), e);
        }
        let dir_name = target_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let urls = collect_urls(&items);
        info!("🖼️ 共 {} 个图片地址，保存到 {}", urls.len(), target_dir.display());

        let mut link_map = BTreeMap::new();
        for url in urls.iter().filter_map(|raw| absolute_url(raw)) {
            if link_map.contains_key(&url) {
                continue;
            }
            let file_name = file_name_for(&url);
            let file_path = target_dir.join(&file_name);

            if !file_path.exists() {
                if !self.download(fetcher, &url, &file_path).await {
                    continue;
                }
                self.fetch_delay.wait().await;
            }

            if file_path.exists() {
                link_map.insert(url, format!("images/{}/{}", dir_name, file_name));
            } else {
                warn!("下载后文件仍不存在: {}", file_path.display());
            }
        }

        debug!("已解析 {}/{} 个图片地址", link_map.len(), urls.len());
        for item in &mut items {
            rewrite_item(item, &link_map);
        }
        items
    }

    async fn download<F: AssetFetcher + ?Sized>(&self, fetcher: &F, url: &str, file_path: &Path) -> bool {
        match fetcher.get(url).await {
            Ok(response) if response.is_success() => {
                match tokio::fs::write(file_path, &response.body).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("写入图片失败 {}: {}", file_path.display(), e);
                        false
                    }
                }
            }
            Ok(response) => {
                warn!("图片下载失败 (状态码 {}): {}", response.status, url);
                false
            }
            Err(e) => {
                warn!("图片下载异常 {}: {}", url, e);
                false
            }
        }
    }
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::new(DelayRange::millis(100, 400))
    }
}

fn collect_urls(items: &[ExtractionItem]) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    for item in items {
        if let ExtractionItem::Material(group) = item {
            urls.extend(group.material.images.iter().map(|i| i.source().to_string()));
        }
        for question in item.questions() {
            urls.extend(question.images.iter().map(|i| i.source().to_string()));
        }
    }
    urls.remove("");
    urls
}

fn rewrite_item(item: &mut ExtractionItem, link_map: &BTreeMap<String, String>) {
    match item {
        ExtractionItem::Regular { question } => rewrite_question(question, link_map),
        ExtractionItem::Material(group) => {
            group.material.content = rewrite_links(&group.material.content, link_map);
            group.material.images = describe_images(&group.material.images, link_map);
            for question in &mut group.questions {
                rewrite_question(question, link_map);
            }
        }
    }
}

fn rewrite_question(question: &mut Question, link_map: &BTreeMap<String, String>) {
    question.stem = rewrite_links(&question.stem, link_map);
    question.analysis = rewrite_links(&question.analysis, link_map);
    question.options = question
        .options
        .iter()
        .map(|option| rewrite_links(option, link_map))
        .collect();
    question.images = describe_images(&question.images, link_map);
}

/// 统一成 `{source, path}`；未解析的地址 path 保留原值
fn describe_images(images: &[ImageRef], link_map: &BTreeMap<String, String>) -> Vec<ImageRef> {
    images
        .iter()
        .map(|image| {
            let raw = image.source();
            let source = absolute_url(raw).unwrap_or_else(|| raw.to_string());
            let fallback = match image {
                ImageRef::Resolved { path, .. } => path.clone(),
                ImageRef::Raw(url) => url.clone(),
            };
            let path = link_map.get(&source).cloned().unwrap_or(fallback);
            ImageRef::Resolved { source, path }
        })
        .collect()
}
