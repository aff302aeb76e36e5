use std::sync::LazyLock;

use regex::Regex;

/// Footer printed on every page of the SENATRAN question bank.
pub const SENATRAN_FOOTER: &str =
    r"(?i)CNH do Brasil\s*-\s*Ministério dos Transportes\s*-\s*Secretaria Nacional de Trânsito";

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static DEFAULT_FOOTERS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| vec![Regex::new(SENATRAN_FOOTER).unwrap()]);

/// Page text cleanup. Pure: the same raw text always yields the same lines.
#[derive(Debug, Clone)]
pub struct Normalizer {
    footers: Vec<Regex>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer {
            footers: DEFAULT_FOOTERS.clone(),
        }
    }
}

impl Normalizer {
    /// Built-in footers plus extra patterns; extra patterns match case-insensitively.
    pub fn with_extra_footers(extra: &[String]) -> Result<Self, regex::Error> {
        let mut footers = DEFAULT_FOOTERS.clone();
        for pat in extra {
            footers.push(Regex::new(&format!("(?i){}", pat))?);
        }
        Ok(Normalizer { footers })
    }

    pub fn clean(&self, raw: &str) -> String {
        let mut text = raw.replace("\r\n", "\n").replace('\r', "\n");
        for footer in &self.footers {
            if footer.is_match(&text) {
                text = footer.replace_all(&text, "").into_owned();
            }
        }
        let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
        text.trim().to_string()
    }

    /// Clean then split in one go.
    pub fn lines(&self, raw: &str) -> Vec<String> {
        split_lines(&self.clean(raw))
    }
}

pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
