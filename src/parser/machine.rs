use serde::Serialize;

use super::lines::{classify, strip_correct_markers, LineKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    WaitStart,
    InStatement,
    InCorrect,
    InComment,
    InWrongs,
}

/// One question reconstructed from the bank, possibly spanning pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuestion {
    pub page_start: u32,
    pub page_end: u32,
    pub sequence_number: u32,
    pub difficulty_raw: String,
    pub statement: String,
    pub plate_code: Option<String>,
    pub correct_answer: String,
    pub wrong_answers: Vec<String>,
    pub comment: String,
    pub raw_block: String,
}

impl ParsedQuestion {
    fn start(page: u32, difficulty: &str, number: u32, rest: &str, line: &str) -> Self {
        ParsedQuestion {
            page_start: page,
            page_end: page,
            sequence_number: number,
            difficulty_raw: difficulty.to_string(),
            statement: rest.to_string(),
            plate_code: None,
            correct_answer: String::new(),
            wrong_answers: Vec::new(),
            comment: String::new(),
            raw_block: format!("{}\n", line),
        }
    }

    fn seal(mut self) -> Self {
        self.raw_block = self.raw_block.trim().to_string();
        self
    }
}

/// Line-at-a-time question parser. Holds only the current state and the
/// question being built; sealed questions are handed back to the caller.
#[derive(Debug)]
pub struct QuestionParser {
    state: State,
    current: Option<ParsedQuestion>,
}

impl Default for QuestionParser {
    fn default() -> Self {
        QuestionParser {
            state: State::WaitStart,
            current: None,
        }
    }
}

impl QuestionParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns the previous question when this line starts a new one.
    pub fn feed(&mut self, page: u32, line: &str) -> Option<ParsedQuestion> {
        let current = self.current.take();
        let (state, current, emitted) = transition(self.state, current, page, line);
        self.state = state;
        self.current = current;
        emitted
    }

    /// End of input: whatever is open is emitted as is, complete or not.
    pub fn finish(mut self) -> Option<ParsedQuestion> {
        self.current.take().map(ParsedQuestion::seal)
    }
}

/// `(state, in-progress, line) → (state, in-progress, emitted)`.
pub fn transition(
    state: State,
    current: Option<ParsedQuestion>,
    page: u32,
    line: &str,
) -> (State, Option<ParsedQuestion>, Option<ParsedQuestion>) {
    let kind = classify(line);

    if let LineKind::QuestionStart {
        difficulty,
        number,
        rest,
    } = kind
    {
        let emitted = current.map(ParsedQuestion::seal);
        let next = ParsedQuestion::start(page, difficulty, number, rest, line);
        return (State::InStatement, Some(next), emitted);
    }

    // Noise before the first question.
    let Some(mut q) = current else {
        return (state, None, None);
    };

    q.page_end = page;
    q.raw_block.push_str(line);
    q.raw_block.push('\n');

    let state = match (state, kind) {
        (s, LineKind::PlateCode(code)) => {
            q.plate_code = Some(code.to_uppercase());
            s
        }
        (_, LineKind::CorrectHeader(rest)) => {
            q.correct_answer = strip_correct_markers(rest);
            State::InCorrect
        }
        (_, LineKind::CommentHeader(rest)) => {
            q.comment = rest.to_string();
            State::InComment
        }
        (_, LineKind::WrongsHeader) => State::InWrongs,
        (State::InWrongs, LineKind::WrongItem(item)) => {
            q.wrong_answers.push(item.to_string());
            State::InWrongs
        }
        (s, _) => {
            continue_field(&mut q, s, line);
            s
        }
    };

    (state, Some(q), None)
}

fn continue_field(q: &mut ParsedQuestion, state: State, line: &str) {
    match state {
        State::InStatement => append(&mut q.statement, line),
        State::InCorrect => append(&mut q.correct_answer, &strip_correct_markers(line)),
        State::InComment => append(&mut q.comment, line),
        State::InWrongs => {
            if let Some(last) = q.wrong_answers.last_mut() {
                append(last, line);
            }
        }
        State::WaitStart => {}
    }
}

fn append(field: &mut String, line: &str) {
    field.push(' ');
    field.push_str(line);
}

/// Run the parser over `(page, line)` pairs in page order.
pub fn parse_questions<'a, I>(lines: I) -> Vec<ParsedQuestion>
where
    I: IntoIterator<Item = (u32, &'a str)>,
{
    let mut parser = QuestionParser::new();
    let mut out: Vec<ParsedQuestion> = lines
        .into_iter()
        .filter_map(|(page, line)| parser.feed(page, line))
        .collect();
    out.extend(parser.finish());
    out
}
