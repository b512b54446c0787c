//! 页面选择器

/// 列表页顶部的分类标签
pub const FILTER_ITEM: &str = "span.categories-item";
/// 列表中的试卷行
pub const PAPER_ITEM: &str = "div.paper-item";
/// 试卷行内的标题
pub const PAPER_TITLE: &str = "div.item-info-title";
/// 考试页的交卷按钮
pub const SUBMIT_BUTTON: &str = "div.submit-btn";
/// 交卷确认弹窗的按钮
pub const CONFIRM_BUTTON: &str = "button.btn-submit";
/// 解析页标记
pub const SOLUTION_TITLE: &str = ".solution-title";
/// 解析页 URL 中的标记
pub const ANALYSIS_URL_MARKER: &str = "solution";
/// 单道题容器
pub const QUESTION_CONTAINER: &str = ".ti-container";

/// 分类标签激活时的 class
pub const ACTIVE_CLASS: &str = "active";

/// 读取页面正文（诊断用）
pub const BODY_TEXT_JS: &str = "document.body ? document.body.innerText : ''";
