use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::question::ExtractionItem;

/// 筛选分类（列表页顶部的科目/分类标签）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCategory {
    pub name: String,
}

impl FilterCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Display for FilterCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// 列表中的一张试卷
///
/// `index` 是易变列表中的位置，每次使用前都要按下标重新查询元素。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRef {
    pub index: usize,
    pub title: String,
}

impl PaperRef {
    /// 标题读取失败，或不含任何字母数字（清洗后为空）时回退为 `Paper_{index}`
    pub fn new(index: usize, title: Option<String>) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| t.chars().any(char::is_alphanumeric))
            .unwrap_or_else(|| format!("Paper_{}", index));
        Self { index, title }
    }
}

/// 一张试卷的抽取结果，写盘后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub filter: String,
    pub items: Vec<ExtractionItem>,
}

impl ExtractionResult {
    pub fn question_count(&self) -> usize {
        self.items.iter().map(|item| item.questions().len()).sum()
    }
}
