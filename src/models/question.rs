use serde::{Deserialize, Serialize};

/// 图片引用
///
/// 抽取阶段只有原始 URL（可能是 `//host/...` 形式），
/// 资源解析之后统一为 `{source, path}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Resolved { source: String, path: String },
    Raw(String),
}

impl ImageRef {
    /// 原始地址（未解析时为抓取到的 src，解析后为绝对 URL）
    pub fn source(&self) -> &str {
        match self {
            ImageRef::Resolved { source, .. } => source,
            ImageRef::Raw(url) => url,
        }
    }
}

/// 单道题目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// 试卷内从 1 开始的序号（包含材料题的子题）
    pub id: u32,
    pub stem: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub keypoints: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl Question {
    pub fn has_analysis(&self) -> bool {
        !self.analysis.trim().is_empty()
    }
}

/// 材料（共享题干）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub content: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// 材料题组：一段材料 + 至少一道子题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialGroup {
    pub material: Material,
    pub questions: Vec<Question>,
}

/// 解析页上的一个条目，按文档顺序排列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExtractionItem {
    Regular { question: Question },
    Material(MaterialGroup),
}

impl ExtractionItem {
    /// 条目内的所有题目
    pub fn questions(&self) -> &[Question] {
        match self {
            ExtractionItem::Regular { question } => std::slice::from_ref(question),
            ExtractionItem::Material(group) => &group.questions,
        }
    }
}
