//! 题目抽取
//!
//! 把解析页的题目容器解析成 [`Question`]，把顶层条目解析成
//! 普通题或材料题组。只依赖传入的 HTML，不访问页面。

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::normalizer::normalize_element;
use crate::models::{ExtractionItem, ImageRef, Material, MaterialGroup, Question};

/// “正确答案”标签
const CORRECT_ANSWER_LABEL: &str = "正确答案";

/// 解析区块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Analysis,
    Source,
    Keypoints,
}

/// 区块标题 → 类型，按顺序匹配，先匹配者生效
pub const SECTION_LABELS: [(&str, SectionKind); 3] = [
    ("解析", SectionKind::Analysis),
    ("来源", SectionKind::Source),
    ("考点", SectionKind::Keypoints),
];

/// 根据标题文字判断区块类型
pub fn classify_section(header: &str) -> Option<SectionKind> {
    let header = header.to_lowercase();
    SECTION_LABELS
        .iter()
        .find(|(label, _)| header.contains(*label))
        .map(|(_, kind)| *kind)
}

struct Selectors {
    format_html: Selector,
    ti_content: Selector,
    option_label: Selector,
    correct_answer: Selector,
    correct_lost: Selector,
    overall_item: Selector,
    overall_item_title: Selector,
    overall_item_value: Selector,
    solution_title_container: Selector,
    keypoint_item: Selector,
    img: Selector,
    tis_container: Selector,
    ti: Selector,
    resizable: Selector,
    materials: Selector,
    ti_container: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            format_html: sel("app-format-html"),
            ti_content: sel(".ti-content"),
            option_label: sel(".choice-radio-label, .choice-checkbox-label"),
            correct_answer: sel(".correct-answer"),
            correct_lost: sel(".correctLost"),
            overall_item: sel(".overall-item"),
            overall_item_title: sel(".overall-item-title"),
            overall_item_value: sel(".overall-item-value"),
            solution_title_container: sel(".solution-title-container"),
            keypoint_item: sel(".solution-keypoint-item"),
            img: sel("img[src]"),
            tis_container: sel(".tis-container"),
            ti: sel(".ti"),
            resizable: sel(".resizable-container"),
            materials: sel(".materials-container"),
            ti_container: sel(".ti-container"),
        }
    }
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("内置选择器必须合法")
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(Selectors::new);

/// 解析单个 `.ti-container`，容器不存在时返回 None
///
/// 返回题目的 `id` 为 0，由调用方按文档顺序分配。
pub fn parse_question(container: Option<ElementRef<'_>>) -> Option<Question> {
    let container = container?;
    let s = &*SELECTORS;
    let mut question = Question::default();

    // 1. 题干
    let stem_el = container
        .select(&s.format_html)
        .next()
        .or_else(|| container.select(&s.ti_content).next());
    if let Some(stem_el) = stem_el {
        question.stem = normalize_element(stem_el);
        collect_images(stem_el, &mut question.images);
    }

    // 2. 选项
    for option in container.select(&s.option_label) {
        question.options.push(normalize_element(option));
        collect_images(option, &mut question.images);
    }

    // 3. 正确答案
    question.correct_answer = find_correct_answer(container);

    // 4. 解析 / 来源 / 考点
    for title in container.select(&s.solution_title_container) {
        let Some(content) = section_content(title) else {
            continue;
        };
        match classify_section(&stripped_text(title)) {
            Some(SectionKind::Analysis) => {
                question.analysis = normalize_element(content);
                collect_images(content, &mut question.images);
            }
            Some(SectionKind::Source) => {
                question.source = stripped_text(content);
            }
            Some(SectionKind::Keypoints) => {
                let items: Vec<String> = content
                    .select(&s.keypoint_item)
                    .map(stripped_text)
                    .collect();
                question.keypoints = if items.is_empty() {
                    vec![stripped_text(content)]
                } else {
                    items
                };
            }
            None => {}
        }
    }

    Some(question)
}

/// 依次尝试三种方式，第一个非空结果生效
fn find_correct_answer(container: ElementRef<'_>) -> String {
    let s = &*SELECTORS;

    // a. 专门的正确答案元素
    if let Some(el) = container.select(&s.correct_answer).next() {
        let answer = stripped_text(el);
        if !answer.is_empty() {
            return answer;
        }
    }

    // b. 漏选标记所在的选项行，取第一个换行前的文字
    if let Some(icon) = container.select(&s.correct_lost).next() {
        let row = icon
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| has_class(*el, "choice-radio"));
        if let Some(row) = row {
            let text: String = row.text().collect();
            let answer = text.trim().split('\n').next().unwrap_or_default().trim();
            if !answer.is_empty() {
                return answer.to_string();
            }
        }
    }

    // c. 作答概览中标题为“正确答案”的一行
    for item in container.select(&s.overall_item) {
        let is_answer_row = item
            .select(&s.overall_item_title)
            .next()
            .is_some_and(|title| title.text().collect::<String>().contains(CORRECT_ANSWER_LABEL));
        if !is_answer_row {
            continue;
        }
        if let Some(value) = item.select(&s.overall_item_value).next() {
            let answer = stripped_text(value);
            if !answer.is_empty() {
                return answer;
            }
        }
    }

    String::new()
}

/// 区块标题对应的内容元素：
/// 有 `app-solution-title` 宿主时取宿主的下一个兄弟元素，否则取父元素的下一个兄弟元素
fn section_content(title: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let host = title
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "app-solution-title");
    let anchor = match host {
        Some(host) => host,
        None => title.parent().and_then(ElementRef::wrap)?,
    };
    anchor.next_siblings().find_map(ElementRef::wrap)
}

/// 解析整页容器的 HTML，按文档顺序返回条目并分配题号
pub fn parse_items(markup: &str) -> Vec<ExtractionItem> {
    let s = &*SELECTORS;
    let document = Html::parse_document(markup);

    let tis: Vec<ElementRef<'_>> = match document.select(&s.tis_container).next() {
        Some(root) => root
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| has_class(*el, "ti"))
            .collect(),
        None => document.select(&s.ti).collect(),
    };

    let mut next_id = 1u32;
    let mut items = Vec::new();

    for ti in tis {
        if let Some(resizable) = ti.select(&s.resizable).next() {
            let mut material = Material::default();
            if let Some(material_el) = resizable.select(&s.materials).next() {
                collect_images(material_el, &mut material.images);
                material.content = normalize_element(material_el);
            }

            let mut questions = Vec::new();
            for sub in ti.select(&s.ti_container) {
                if let Some(mut question) = parse_question(Some(sub)) {
                    question.id = next_id;
                    next_id += 1;
                    questions.push(question);
                }
            }

            if questions.is_empty() {
                debug!("材料题组没有可解析的子题，已丢弃");
                continue;
            }
            items.push(ExtractionItem::Material(MaterialGroup {
                material,
                questions,
            }));
        } else if let Some(mut question) = parse_question(ti.select(&s.ti_container).next()) {
            question.id = next_id;
            next_id += 1;
            items.push(ExtractionItem::Regular { question });
        }
    }

    items
}

fn collect_images(element: ElementRef<'_>, images: &mut Vec<ImageRef>) {
    for img in element.select(&SELECTORS.img) {
        if let Some(src) = img.value().attr("src").filter(|src| !src.is_empty()) {
            images.push(ImageRef::Raw(src.to_string()));
        }
    }
}

/// 每段文字去掉首尾空白后直接拼接
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}
