// Broken-paragraph repair for extracted text. PDF and column layouts leave hard
// wraps mid-sentence; these are rejoined so sentence boundaries survive.

use std::sync::LazyLock;

use regex::Regex;

static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[•▪◦‣*-]\s|\d{1,3}[.)]\s)").unwrap());

/// Lines shorter than this (in words) across a whole paragraph mark it as a
/// list, table or address block whose breaks are intentional.
const SHORT_LINE_WORDS: usize = 5;

pub fn repair_paragraphs(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    PARAGRAPH_BREAK_RE
        .split(&normalized)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(repair_paragraph)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn repair_paragraph(paragraph: &str) -> String {
    let lines: Vec<&str> = paragraph.lines().map(str::trim_end).collect();
    if lines
        .iter()
        .all(|l| l.split_whitespace().count() < SHORT_LINE_WORDS)
    {
        return lines.join("\n");
    }

    let mut out = String::with_capacity(paragraph.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            let keep_break = ends_sentence(lines[i - 1]) || BULLET_RE.is_match(line);
            out.push(if keep_break { '\n' } else { ' ' });
        }
        out.push_str(if i > 0 { line.trim_start() } else { line });
    }
    out
}

fn ends_sentence(line: &str) -> bool {
    let stripped = line.trim_end_matches(['"', '\'', ')', ']', '”', '’']);
    stripped.ends_with(['.', '!', '?', ':', ';'])
}
