//! Just enough Markdown → HTML for the digest email.
//!
//! Handles what the digest actually uses: pipe tables, `#`..`###` headings,
//! `**bold**`, `[text](url)` links, `---` rules, `- ` lists and line breaks. Input is
//! HTML-escaped first, so tweet text can never inject markup.
use std::sync::OnceLock;

use regex::{Captures, Regex};

const STYLE: &str = r#"body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
      line-height: 1.6;
      color: #333;
      max-width: 800px;
      margin: 0 auto;
      padding: 20px;
    }
    h1, h2, h3 { color: #2c3e50; margin-top: 24px; }
    a { color: #3498db; text-decoration: none; }
    a:hover { text-decoration: underline; }
    ul { padding-left: 20px; }"#;

const TH_STYLE: &str = "background:#f5f5f5;padding:10px;border:1px solid #ddd;text-align:left;";
const TD_STYLE: &str = "padding:10px;border:1px solid #ddd;";

struct Rules {
    table: Regex,
    h3: Regex,
    h2: Regex,
    h1: Regex,
    bold: Regex,
    link: Regex,
    rule: Regex,
    item: Regex,
    list: Regex,
}

impl Rules {
    fn build() -> Result<Self, regex::Error> {
        Ok(Self {
            table: Regex::new(r"(?m)(?:^\|[^\n]*\|[ \t]*(?:\n|$))+")?,
            h3: Regex::new(r"(?m)^### (.+)$")?,
            h2: Regex::new(r"(?m)^## (.+)$")?,
            h1: Regex::new(r"(?m)^# (.+)$")?,
            bold: Regex::new(r"\*\*(.+?)\*\*")?,
            link: Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)")?,
            rule: Regex::new(r"(?m)^-{3,}[ \t]*$")?,
            item: Regex::new(r"(?m)^[-*] (.+)$")?,
            list: Regex::new(r"(?:<li>.*</li>\n?)+")?,
        })
    }
}

fn rules() -> Option<&'static Rules> {
    static RULES: OnceLock<Option<Rules>> = OnceLock::new();
    RULES
        .get_or_init(|| match Rules::build() {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::error!(error = %e, "markdown rules failed to compile");
                None
            }
        })
        .as_ref()
}

/// Render `md` as a complete, styled HTML document.
pub fn markdown_to_html(md: &str) -> String {
    let escaped = escape_html(&md.replace("\r\n", "\n"));
    let body = match rules() {
        Some(r) => render(r, &escaped),
        None => format!("<pre>{escaped}</pre>"),
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  <style>\n    {STYLE}\n  </style>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

fn render(r: &Rules, text: &str) -> String {
    let html = r.table.replace_all(text, |c: &Captures| table(&c[0]));
    let html = r.h3.replace_all(&html, "<h3>${1}</h3>");
    let html = r.h2.replace_all(&html, "<h2>${1}</h2>");
    let html = r.h1.replace_all(&html, "<h1>${1}</h1>");
    let html = r.bold.replace_all(&html, "<strong>${1}</strong>");
    let html = r.link.replace_all(&html, "<a href=\"${2}\">${1}</a>");
    let html = r.rule.replace_all(&html, "<hr>");
    let html = r.item.replace_all(&html, "<li>${1}</li>");
    let html = r
        .list
        .replace_all(&html, |c: &Captures| format!("<ul>{}</ul>", c[0].replace('\n', "")));
    html.trim_end()
        .replace("\n\n", "<br><br>")
        .replace('\n', "<br>")
}

fn cells(line: &str) -> Vec<&str> {
    line.split('|').map(str::trim).filter(|c| !c.is_empty()).collect()
}

fn is_separator(line: &str) -> bool {
    cells(line)
        .iter()
        .all(|c| c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
}

fn table(block: &str) -> String {
    let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return block.to_string();
    }
    let mut out = String::from("<table style=\"border-collapse:collapse;margin:15px 0;width:100%;\"><thead><tr>");
    for cell in cells(lines[0]) {
        out.push_str(&format!("<th style=\"{TH_STYLE}\">{cell}</th>"));
    }
    out.push_str("</tr></thead><tbody>");
    let rows = if is_separator(lines[1]) { &lines[2..] } else { &lines[1..] };
    for row in rows {
        let row = cells(row);
        if row.is_empty() {
            continue;
        }
        out.push_str("<tr>");
        for cell in row {
            out.push_str(&format!("<td style=\"{TD_STYLE}\">{cell}</td>"));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(md: &str) -> String {
        let html = markdown_to_html(md);
        let start = html.find("<body>\n").unwrap() + "<body>\n".len();
        let end = html.rfind("\n</body>").unwrap();
        html[start..end].to_string()
    }

    #[test]
    fn headings_bold_and_links() {
        assert_eq!(
            body("## 📰 X 简报\n**GPT-5** [post](https://x.com/a?b=1&c=2)"),
            "<h2>📰 X 简报</h2><br><strong>GPT-5</strong> <a href=\"https://x.com/a?b=1&amp;c=2\">post</a>"
        );
    }

    #[test]
    fn lists_are_wrapped_once() {
        assert_eq!(
            body("intro\n- one\n- two\n\nafter"),
            "intro<br><ul><li>one</li><li>two</li></ul><br>after"
        );
    }

    #[test]
    fn horizontal_rules() {
        assert_eq!(body("above\n---\nbelow"), "above<br><hr><br>below");
    }

    #[test]
    fn tables_become_html_tables() {
        let html = body("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.starts_with("<table"));
        assert!(html.contains(">a</th>"));
        assert!(html.contains(">2</td>"));
        assert!(!html.contains("---"));
    }

    #[test]
    fn tweet_markup_is_escaped() {
        let html = body("<script>alert(1)</script> & \"quotes\"");
        assert_eq!(html, "&lt;script&gt;alert(1)&lt;/script&gt; &amp; &quot;quotes&quot;");
    }

    #[test]
    fn wraps_in_styled_document() {
        let html = markdown_to_html("hi");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"utf-8\">"));
        assert!(html.contains("max-width: 800px"));
    }
}
