use std::sync::LazyLock;

use regex::Regex;

// Question header as printed in the bank, e.g. "G (Fácil) 1. Ao ver a placa..."
static QUESTION_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z]\s*\((Fácil|Intermediário|Difícil)\)\s*(\d+)\.\s*(.*)$").unwrap()
});
static PLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Código da placa:\s*([A-Z0-9\-]+)\s*$").unwrap());
static CORRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Alternativa correta:\s*(.*)$").unwrap());
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Comentário:\s*(.*)$").unwrap());
static WRONG_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Respostas incorretas:\s*$").unwrap());
// Bullets used in front of wrong answers; \x17 is how one of them survives extraction.
static WRONG_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[↨✗xX\x{17}]\s*(.*)$").unwrap());
// Check marks after the correct answer; \x13 is the extracted form of one glyph.
static CORRECT_MARKERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[✓‼\x{13}]\s*)+$").unwrap());

/// What a single normalized line is, decided once per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    QuestionStart {
        difficulty: &'a str,
        number: u32,
        rest: &'a str,
    },
    PlateCode(&'a str),
    CorrectHeader(&'a str),
    CommentHeader(&'a str),
    WrongsHeader,
    /// Only meaningful inside the wrong-answers list; elsewhere it is plain text.
    WrongItem(&'a str),
    Text,
}

pub fn classify(line: &str) -> LineKind<'_> {
    if let Some(caps) = QUESTION_START_RE.captures(line) {
        // A sequence number too large for u32 is not a question number.
        if let Ok(number) = caps[2].parse::<u32>() {
            return LineKind::QuestionStart {
                difficulty: caps.get(1).map_or("", |m| m.as_str()),
                number,
                rest: caps.get(3).map_or("", |m| m.as_str().trim()),
            };
        }
    }
    if let Some(caps) = PLATE_RE.captures(line) {
        return LineKind::PlateCode(caps.get(1).map_or("", |m| m.as_str()));
    }
    if let Some(caps) = CORRECT_RE.captures(line) {
        return LineKind::CorrectHeader(caps.get(1).map_or("", |m| m.as_str()));
    }
    if let Some(caps) = COMMENT_RE.captures(line) {
        return LineKind::CommentHeader(caps.get(1).map_or("", |m| m.as_str().trim()));
    }
    if WRONG_HEADER_RE.is_match(line) {
        return LineKind::WrongsHeader;
    }
    if let Some(caps) = WRONG_ITEM_RE.captures(line) {
        return LineKind::WrongItem(caps.get(1).map_or("", |m| m.as_str().trim()));
    }
    LineKind::Text
}

/// Drop the check-mark glyphs that trail a correct answer, then trim.
pub fn strip_correct_markers(text: &str) -> String {
    CORRECT_MARKERS_RE.replace(text, "").trim().to_string()
}
