//! Narrative feedback report: a local literacy-bracket lookup and category
//! tally, then two completions (report, then HTML reformat).

use std::collections::BTreeMap;

use crate::error::ProviderError;
use crate::quiz::ai_helper::Completer;
use crate::quiz::prompts::{self, FeedbackContext};
use crate::quiz::scoring::ScoreResult;
use crate::quiz::{Category, TestResponse};

/// Literacy level with the economic outcomes the NALS reports for it.
#[derive(Debug, PartialEq, Eq)]
pub struct NalsBracket {
    pub name: &'static str,
    pub upper_bound: Option<i64>,
    pub economic_indicators: &'static str,
    pub employment: &'static str,
    pub professional_rate: &'static str,
    /// Register the report should be written in.
    pub language_style: &'static str,
}

pub static NALS_BRACKETS: [NalsBracket; 5] = [
    NalsBracket {
        name: "Level 1 (≤225)",
        upper_bound: Some(225),
        economic_indicators: "52% di luar angkatan kerja, 43% hidup dalam kemiskinan",
        employment: "30% bekerja penuh waktu, median upah mingguan $240",
        professional_rate: "5% bekerja di posisi profesional/manajerial",
        language_style: "sederhana dan langsung",
    },
    NalsBracket {
        name: "Level 2 (226-275)",
        upper_bound: Some(275),
        economic_indicators: "35% di luar angkatan kerja, 23% hidup dalam kemiskinan",
        employment: "43% bekerja penuh waktu, median upah mingguan $281",
        professional_rate: "12% bekerja di posisi profesional/manajerial",
        language_style: "sederhana dan langsung",
    },
    NalsBracket {
        name: "Level 3 (276-325)",
        upper_bound: Some(325),
        economic_indicators: "25% di luar angkatan kerja, 12% hidup dalam kemiskinan",
        employment: "54% bekerja penuh waktu, median upah mingguan $339",
        professional_rate: "23% bekerja di posisi profesional/manajerial",
        language_style: "seimbang dan informatif",
    },
    NalsBracket {
        name: "Level 4 (326-375)",
        upper_bound: Some(375),
        economic_indicators: "17% di luar angkatan kerja, 8% hidup dalam kemiskinan",
        employment: "64% bekerja penuh waktu, median upah mingguan $465",
        professional_rate: "46% bekerja di posisi profesional/manajerial",
        language_style: "detail dan analitis",
    },
    NalsBracket {
        name: "Level 5 (376-500)",
        upper_bound: None,
        economic_indicators: "11% di luar angkatan kerja, 4% hidup dalam kemiskinan",
        employment: "72% bekerja penuh waktu, median upah mingguan $650",
        professional_rate: "70% bekerja di posisi profesional/manajerial",
        language_style: "kompleks dan mendalam",
    },
];

pub fn nals_bracket(iq_estimate: i64) -> &'static NalsBracket {
    let last = &NALS_BRACKETS[NALS_BRACKETS.len() - 1];
    NALS_BRACKETS
        .iter()
        .find(|b| b.upper_bound.is_some_and(|upper| iq_estimate <= upper))
        .unwrap_or(last)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTally {
    pub category: Option<Category>,
    pub correct: u32,
    pub incorrect: u32,
}

impl CategoryTally {
    pub fn label(&self) -> &'static str {
        self.category.map(Category::label).unwrap_or("Unknown")
    }
}

/// Correct/incorrect counts per category, uncategorised answers first.
pub fn tally_categories(responses: &[TestResponse]) -> Vec<CategoryTally> {
    let mut tallies: BTreeMap<Option<Category>, CategoryTally> = BTreeMap::new();
    for response in responses {
        let tally = tallies.entry(response.category).or_insert(CategoryTally {
            category: response.category,
            correct: 0,
            incorrect: 0,
        });
        if response.is_correct {
            tally.correct += 1;
        } else {
            tally.incorrect += 1;
        }
    }
    tallies.into_values().collect()
}

pub struct FeedbackRequest<'a> {
    pub score: &'a ScoreResult,
    pub total_questions: u32,
    pub responses: &'a [TestResponse],
    pub with_categories: bool,
}

/// Runs the report and HTML stages. Any provider failure aborts the whole
/// report; there is no partial result.
pub async fn generate_feedback(
    completer: &dyn Completer,
    request: &FeedbackRequest<'_>,
) -> Result<String, ProviderError> {
    let bracket = nals_bracket(request.score.iq_estimate);
    let categories = request
        .with_categories
        .then(|| tally_categories(request.responses));

    let report_prompt = prompts::feedback_report(&FeedbackContext {
        score: request.score,
        total_questions: request.total_questions,
        responses: request.responses,
        bracket,
        categories: categories.as_deref(),
    });
    log::debug!("Feedback prompt: {report_prompt}");
    let report = completer.complete(&report_prompt).await?;
    log::debug!("Feedback response: {report}");

    let html_prompt = prompts::html_reformat(&report);
    log::debug!("HTML prompt: {html_prompt}");
    let html = completer.complete(&html_prompt).await?;
    log::debug!("HTML response: {html}");

    Ok(html.trim_start().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::ai_helper::testing::ScriptedCompleter;

    fn response(question: &str, correct: bool, category: Option<Category>) -> TestResponse {
        TestResponse {
            question_text: question.to_string(),
            answer_text: "jawaban".to_string(),
            is_correct: correct,
            category,
        }
    }

    #[test]
    fn bracket_thresholds() {
        assert_eq!(nals_bracket(101).name, "Level 1 (≤225)");
        assert_eq!(nals_bracket(225).name, "Level 1 (≤225)");
        assert_eq!(nals_bracket(226).name, "Level 2 (226-275)");
        assert_eq!(nals_bracket(275).name, "Level 2 (226-275)");
        assert_eq!(nals_bracket(325).name, "Level 3 (276-325)");
        assert_eq!(nals_bracket(375).name, "Level 4 (326-375)");
        assert_eq!(nals_bracket(376).name, "Level 5 (376-500)");
        assert_eq!(nals_bracket(900).name, "Level 5 (376-500)");
    }

    #[test]
    fn tallies_group_by_category() {
        let responses = vec![
            response("a", true, Some(Category::NumberSeries)),
            response("b", false, Some(Category::NumberSeries)),
            response("c", true, None),
            response("d", true, Some(Category::Antonym)),
            response("e", true, Some(Category::NumberSeries)),
        ];

        let tallies = tally_categories(&responses);
        assert_eq!(
            tallies,
            vec![
                CategoryTally { category: None, correct: 1, incorrect: 0 },
                CategoryTally { category: Some(Category::Antonym), correct: 1, incorrect: 0 },
                CategoryTally { category: Some(Category::NumberSeries), correct: 2, incorrect: 1 },
            ]
        );
        assert_eq!(tallies[0].label(), "Unknown");
    }

    #[tokio::test]
    async fn report_then_html_trimmed() {
        let completer = ScriptedCompleter::new(["Laporan mentah", "\n\n   <h1>Laporan</h1>\n"]);
        let score = ScoreResult::new(24, 47);
        let responses = vec![
            response("2, 4, 8, ...?", true, Some(Category::NumberSeries)),
            response("Lawan kata TINGGI?", false, Some(Category::Antonym)),
        ];

        let html = generate_feedback(
            &completer,
            &FeedbackRequest {
                score: &score,
                total_questions: 47,
                responses: &responses,
                with_categories: true,
            },
        )
        .await
        .unwrap();

        assert_eq!(html, "<h1>Laporan</h1>\n");

        let prompts = completer.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Skor mentah: 24 dari 47"));
        assert!(prompts[0].contains("Perkiraan skor IQ: 101"));
        assert!(prompts[0].contains("2, 4, 8, ...? -> Jawaban: jawaban, Benar: true"));
        assert!(prompts[0].contains("sederhana dan langsung"));
        assert!(prompts[0].contains("- Numerical Reasoning (Number Series): Correct: 1, Incorrect: 0<br>"));
        assert!(prompts[1].contains("Laporan mentah"));
    }

    #[tokio::test]
    async fn categories_left_out_when_not_requested() {
        let completer = ScriptedCompleter::new(["r", "<p>h</p>"]);
        let score = ScoreResult::new(10, 47);
        let responses = vec![response("q", true, Some(Category::Matching))];

        generate_feedback(
            &completer,
            &FeedbackRequest {
                score: &score,
                total_questions: 47,
                responses: &responses,
                with_categories: false,
            },
        )
        .await
        .unwrap();

        assert!(!completer.prompts()[0].contains("Category Performance"));
    }

    #[tokio::test]
    async fn provider_failure_aborts_report() {
        let completer = ScriptedCompleter::new(["report"]);
        completer.push_failure("rate limited");
        let score = ScoreResult::new(30, 47);

        let result = generate_feedback(
            &completer,
            &FeedbackRequest {
                score: &score,
                total_questions: 47,
                responses: &[],
                with_categories: false,
            },
        )
        .await;

        assert!(matches!(result, Err(ProviderError::Backend(_))));
        assert_eq!(completer.calls(), 2);
    }
}
