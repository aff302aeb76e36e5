pub mod lines;
pub mod machine;
pub mod normalize;

use crate::extract::PageText;
pub use machine::{parse_questions, ParsedQuestion};
use normalize::Normalizer;

/// Two-step pipeline: page text → normalized lines → questions.
/// Pages are flattened in the order given, so continuations carry across
/// page breaks.
pub fn parse_pages(normalizer: &Normalizer, pages: &[PageText]) -> Vec<ParsedQuestion> {
    let page_lines: Vec<(u32, Vec<String>)> = pages
        .iter()
        .map(|p| (p.page_number, normalizer.lines(&p.text)))
        .collect();

    parse_questions(
        page_lines
            .iter()
            .flat_map(|(page, lines)| lines.iter().map(move |l| (*page, l.as_str()))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::split_form_feeds;

    fn fixture_questions() -> Vec<ParsedQuestion> {
        let raw = std::fs::read("tests/fixtures/senatran_sample.txt").unwrap();
        let pages = split_form_feeds(&raw).unwrap();
        parse_pages(&Normalizer::default(), &pages)
    }

    #[test]
    fn fixture_question_count_and_order() {
        let qs = fixture_questions();
        let numbers: Vec<u32> = qs.iter().map(|q| q.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn fixture_question_spanning_pages() {
        let qs = fixture_questions();
        let q = &qs[2];
        assert_eq!((q.page_start, q.page_end), (1, 2));
        assert_eq!(
            q.statement,
            "Ao se aproximar de um cruzamento sem sinalização, o condutor deve dar preferência:"
        );
        assert_eq!(q.correct_answer, "Ao veículo que vem pela direita.");
        assert_eq!(q.wrong_answers.len(), 3);
    }

    #[test]
    fn fixture_footer_never_leaks() {
        for q in fixture_questions() {
            assert!(!q.raw_block.contains("Secretaria Nacional"), "{}", q.raw_block);
        }
    }

    #[test]
    fn fixture_plate_codes() {
        let qs = fixture_questions();
        assert_eq!(qs[0].plate_code.as_deref(), Some("R-1"));
        assert_eq!(qs[1].plate_code.as_deref(), Some("A-18"));
        assert_eq!(qs[2].plate_code, None);
    }

    #[test]
    fn fixture_multiline_wrong_answer() {
        let qs = fixture_questions();
        assert_eq!(
            qs[0].wrong_answers,
            vec![
                "Dê a preferência.",
                "Sentido proibido para todos os veículos que trafegam pela via.",
                "Siga em frente.",
            ]
        );
    }

    #[test]
    fn fixture_second_module_question() {
        let qs = fixture_questions();
        let q = &qs[4];
        assert_eq!(q.page_start, 3);
        assert_eq!(q.difficulty_raw, "Difícil");
        assert_eq!(q.comment, "O uso do cinto é obrigatório para todos os ocupantes do veículo.");
        assert_eq!(q.correct_answer, "Todos os ocupantes do veículo.");
    }
}
