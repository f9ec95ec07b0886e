//! Body normalization: strip HTML and cut quoted replies and signatures.
//!
//! Pure string processing.

use std::sync::LazyLock;

use regex::Regex;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*(script|style)\b[^>]*>.*?<\s*/\s*(script|style)\s*>").unwrap()
});

/// Tags that start or end a visual line.
static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(br|/?p|/?div|/?li|/?tr|/?h[1-6]|/blockquote)\b[^>]*>").unwrap()
});

/// Openers of quoted history: `<blockquote>` and the Gmail/Yahoo quote
/// containers that wrap the "On ... wrote:" attribution.
static QUOTE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<\s*blockquote\b[^>]*>|<\s*div\b[^>]*\bclass\s*=\s*["'][^"']*\b(gmail_quote|yahoo_quoted)\b[^>]*>"#,
    )
    .unwrap()
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[A-Za-z!][^>]*>").unwrap());

static REPLY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(from|sent|to|cc|subject|date):(\s|$)").unwrap());

/// Normalize a raw message body into trimmed plain text.
pub fn clean_text(raw: &str) -> String {
    let text = if looks_like_html(raw) {
        strip_html(raw)
    } else {
        raw.replace("\r\n", "\n")
    };
    strip_quoted_text(&text)
}

/// Cheap check for markup worth stripping.
pub fn looks_like_html(text: &str) -> bool {
    TAG.is_match(text)
}

/// Strip HTML tags, keeping block structure as line breaks.
///
/// Quoted history is turned into `> ` lines so `strip_quoted_text` cuts it
/// the same way it cuts a plain-text reply.
pub fn strip_html(html: &str) -> String {
    let text = html.replace("\r\n", "\n");
    let text = COMMENT.replace_all(&text, "");
    let text = SCRIPT_OR_STYLE.replace_all(&text, "");
    let text = QUOTE_OPEN.replace_all(&text, "\n> ");
    let text = BLOCK_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Decode the handful of entities that show up in mail bodies.
///
/// `&lt;` and `&gt;` stay encoded so no angle-bracket pair is reintroduced.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Strip reply headers and cut at the first signature or quote block.
///
/// Removes:
/// - "On ... wrote:" attribution lines
/// - `From:` / `Sent:` / `To:` / `Cc:` / `Subject:` header lines
///
/// Truncates at:
/// - a line that is exactly `--` (signature delimiter)
/// - the first quoted line (`>` prefix)
/// - an "Original Message" separator
pub fn strip_quoted_text(body: &str) -> String {
    let mut result: Vec<&str> = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim();

        if trimmed == "--" || trimmed.starts_with('>') {
            break;
        }

        if trimmed.starts_with("---") && trimmed.contains("Original Message") {
            break;
        }

        if trimmed.starts_with("On ") && trimmed.ends_with("wrote:") {
            continue;
        }

        if REPLY_HEADER.is_match(trimmed) {
            continue;
        }

        // Collapse runs of blank lines
        if trimmed.is_empty() && result.last().is_some_and(|l| l.trim().is_empty()) {
            continue;
        }

        result.push(line.trim_end());
    }

    result.join("\n").trim().to_string()
}
