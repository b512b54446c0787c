//! 标记清洗
//!
//! 把框架生成的 DOM 片段压平成只含文本、`<img>`、`<br>` 的最小 HTML：
//!
//! 1. 删除注释
//! 2. 整棵删除 input / style / script / button / link / meta
//! 3. 其余元素一律展开（保留子节点与文本的原有顺序）
//! 4. `<img>` 只保留 src / alt / width / height
//!
//! 对自身输出再次清洗结果不变。

use scraper::{ElementRef, Html, Node};

/// 连同子树一起删除的标签
const DROPPED_TAGS: [&str; 6] = ["input", "style", "script", "button", "link", "meta"];

/// `<img>` 保留的属性，按此顺序输出
const IMG_ATTRS: [&str; 4] = ["src", "alt", "width", "height"];

/// 清洗一段 HTML 字符串
pub fn normalize(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    normalize_element(html.root_element())
}

/// 清洗元素的内部内容（元素本身也被展开）
pub fn normalize_element(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    write_children(element, &mut out);
    out.trim().to_string()
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out);
                }
            }
            // 注释、doctype 等全部丢弃
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if DROPPED_TAGS.contains(&name) {
        return;
    }
    match name {
        "img" => write_img(element, out),
        "br" => out.push_str("<br>"),
        _ => write_children(element, out),
    }
}

fn write_img(element: ElementRef<'_>, out: &mut String) {
    out.push_str("<img");
    for attr in IMG_ATTRS {
        if let Some(value) = element.value().attr(attr) {
            out.push(' ');
            out.push_str(attr);
            out.push_str("=\"");
            escape_attr(value, out);
            out.push('"');
        }
    }
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURES: &[&str] = &[
        "<div>What is <b>2+2</b>?</div>",
        "<span>Four</span>",
        "<app-format-html><p>甲<!-- ng --><em>乙</em></p><p>丙</p></app-format-html>",
        r#"<div class="x"><img class="big" src="//h/a.png" alt="a" style="w" data-id="1" width="20">text<br/>more</div>"#,
        "<p>a &lt; b &amp;&amp; c &gt; d</p>",
        "<div><script>alert(1)</script><style>.a{}</style><button>提交</button><input value=\"x\">保留</div>",
        "<table><tr><td>单元格</td></tr></table><ul><li>一</li><li>二</li></ul>",
        "   \n  <span>  空白  </span>\n ",
        r#"<a href="/x"><u>链接</u></a><link rel="x"><meta charset="utf-8"><img src="https://h/q.png?a=1&b=2">"#,
    ];

    fn element_names(html: &str) -> Vec<String> {
        let doc = Html::parse_fragment(html);
        doc.root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .skip(1)
            .map(|e| e.value().name().to_string())
            .collect()
    }

    #[test]
    fn test_flattens_inline_wrappers() {
        assert_eq!(normalize("<div>What is <b>2+2</b>?</div>"), "What is 2+2?");
        assert_eq!(normalize("<span>Four</span>"), "Four");
    }

    #[test]
    fn test_drops_comments_and_noise_subtrees() {
        let out = normalize(FIXTURES[5]);
        assert_eq!(out, "保留");
        assert_eq!(normalize("<p>a<!-- hidden -->b</p>"), "ab");
    }

    #[test]
    fn test_img_attribute_whitelist() {
        let out = normalize(FIXTURES[3]);
        assert_eq!(
            out,
            r#"<img src="//h/a.png" alt="a" width="20">text<br>more"#
        );
    }

    #[test]
    fn test_output_contains_only_allowed_elements() {
        for fixture in FIXTURES {
            let out = normalize(fixture);
            for name in element_names(&out) {
                assert!(
                    ["p", "img", "br"].contains(&name.as_str()),
                    "unexpected <{}> in {:?}",
                    name,
                    out
                );
            }
            assert!(!out.contains("<!--"));
        }
    }

    #[test]
    fn test_idempotent() {
        for fixture in FIXTURES {
            let once = normalize(fixture);
            assert_eq!(normalize(&once), once, "fixture: {}", fixture);
        }
    }

    #[test]
    fn test_escapes_survive_roundtrip() {
        assert_eq!(normalize(FIXTURES[4]), "a &lt; b &amp;&amp; c &gt; d");
        let out = normalize(FIXTURES[8]);
        assert_eq!(out, r#"链接<img src="https://h/q.png?a=1&amp;b=2">"#);
    }

    #[test]
    fn test_element_inner_content() {
        let doc = Html::parse_fragment(r#"<div id="root"><span>x</span><br></div>"#);
        let selector = scraper::Selector::parse("#root").unwrap();
        let root = doc.select(&selector).next().unwrap();
        assert_eq!(normalize_element(root), "x<br>");
    }
}
