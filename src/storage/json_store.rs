//! 抽取结果落盘
//!
//! `{root}/{filter}_{title}.json`，图片放在 `{root}/images/{title}/`。

use std::path::PathBuf;

use tracing::info;

use crate::error::Result;
use crate::models::ExtractionResult;

/// 只保留字母数字（含中文）和空格，并去掉首尾空白
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 一张试卷的图片目录
    pub fn image_dir(&self, title: &str) -> PathBuf {
        self.root.join("images").join(sanitize_title(title))
    }

    pub fn result_path(&self, filter: &str, title: &str) -> PathBuf {
        self.root.join(format!(
            "{}_{}.json",
            sanitize_title(filter),
            sanitize_title(title)
        ))
    }

    /// 写入格式化的 JSON，返回文件路径
    pub async fn save(&self, result: &ExtractionResult) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.result_path(&result.filter, &result.title);
        let content = serde_json::to_string_pretty(result)?;
        tokio::fs::write(&path, content).await?;
        info!(
            "💾 已保存 {} 道题 → {}",
            result.question_count(),
            path.display()
        );
        Ok(path)
    }
}
