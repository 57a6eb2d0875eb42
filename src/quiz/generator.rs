//! Question regeneration: a configurable chain of completion stages, an
//! optional self-audit, and a bounded retry loop around the whole chain.

use std::sync::Arc;

use crate::error::{GenerationError, ParseError, ProviderError};
use crate::quiz::ai_helper::Completer;
use crate::quiz::extract::trailing_json_object;
use crate::quiz::prompts;
use crate::quiz::{Answer, Category, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    TranslateToEnglish,
    RewriteInEnglish,
    TranslateToIndonesian,
    RephraseAsJson,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::TranslateToEnglish => "translate-to-english",
            Stage::RewriteInEnglish => "rewrite-in-english",
            Stage::TranslateToIndonesian => "translate-to-indonesian",
            Stage::RephraseAsJson => "rephrase-as-json",
        }
    }

    /// Stages after the first only see the previous stage's text.
    fn prompt(self, source: &Question, previous: Option<&str>) -> String {
        let previous = previous.unwrap_or(source.text.as_str());
        match self {
            Stage::TranslateToEnglish => prompts::translate_to_english(source),
            Stage::RewriteInEnglish => prompts::rewrite_in_english(source.category, previous),
            Stage::TranslateToIndonesian => prompts::translate_to_indonesian(previous),
            Stage::RephraseAsJson => prompts::rephrase_as_json(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub stages: Vec<Stage>,
    pub self_audit: bool,
    pub max_attempts: usize,
}

impl PipelineConfig {
    /// Translate, rewrite, translate back, then audit and regenerate JSON.
    pub fn audited(max_attempts: usize) -> Self {
        Self {
            stages: vec![
                Stage::TranslateToEnglish,
                Stage::RewriteInEnglish,
                Stage::TranslateToIndonesian,
            ],
            self_audit: true,
            max_attempts,
        }
    }

    /// One completion that rephrases in place and answers with JSON.
    pub fn rephrase(max_attempts: usize) -> Self {
        Self {
            stages: vec![Stage::RephraseAsJson],
            self_audit: false,
            max_attempts,
        }
    }
}

/// One completion round trip, kept for logging and tests.
#[derive(Debug, Clone)]
pub struct CompletionStage {
    pub stage_name: &'static str,
    pub prompt_text: String,
    pub response_text: String,
}

/// Outcome of a single pass through the stages.
#[derive(Debug)]
pub struct Attempt {
    pub stages: Vec<CompletionStage>,
    pub outcome: Result<Question, ParseError>,
}

/// What the model is asked to return. Every field is optional here so a
/// missing one is reported by name instead of as a decode error.
#[derive(Debug, serde::Deserialize)]
struct Candidate {
    question: Option<String>,
    answers: Option<Vec<Answer>>,
    #[serde(rename = "correctAnswerIndex")]
    correct_answer_index: Option<i64>,
    #[serde(default, deserialize_with = "crate::quiz::lenient_category")]
    category: Option<Category>,
}

impl Candidate {
    fn into_question(self, expected_category: Option<Category>) -> Result<Question, ParseError> {
        let text = self
            .question
            .filter(|t| !t.trim().is_empty())
            .ok_or(ParseError::MissingField("question"))?;
        let answers = self
            .answers
            .filter(|a| !a.is_empty())
            .ok_or(ParseError::MissingField("answers"))?;
        let index = self
            .correct_answer_index
            .ok_or(ParseError::MissingField("correctAnswerIndex"))?;
        let correct_answer_index = usize::try_from(index)
            .ok()
            .filter(|i| *i < answers.len())
            .ok_or(ParseError::AnswerIndexOutOfRange {
                index,
                options: answers.len(),
            })?;

        let mut question = Question::new(text, answers, correct_answer_index);
        if expected_category.is_some() {
            question.category = Some(self.category.ok_or(ParseError::MissingField("category"))?);
        }
        Ok(question)
    }
}

/// Decodes the trailing JSON object of a completion into a validated question.
pub fn parse_candidate(response: &str, expected_category: Option<Category>) -> Result<Question, ParseError> {
    let json = trailing_json_object(response)?;
    let candidate: Candidate = serde_json::from_str(json)?;
    candidate.into_question(expected_category)
}

pub struct QuestionGenerator {
    completer: Arc<dyn Completer>,
    config: PipelineConfig,
}

impl QuestionGenerator {
    pub fn new(completer: Arc<dyn Completer>, config: PipelineConfig) -> Self {
        Self { completer, config }
    }

    async fn run_stage(
        &self,
        stage_name: &'static str,
        prompt_text: String,
        trace: &mut Vec<CompletionStage>,
    ) -> Result<String, ProviderError> {
        log::debug!("[{stage_name}] prompt: {prompt_text}");
        let response_text = self.completer.complete(&prompt_text).await?;
        log::debug!("[{stage_name}] response: {response_text}");

        trace.push(CompletionStage {
            stage_name,
            prompt_text,
            response_text: response_text.clone(),
        });
        Ok(response_text)
    }

    /// One pass through the configured stages. Provider errors abort; bad
    /// model output is reported in `Attempt::outcome`.
    pub async fn attempt(&self, source: &Question) -> Result<Attempt, ProviderError> {
        let mut trace = Vec::with_capacity(self.config.stages.len() + 2);
        let mut previous: Option<String> = None;

        for stage in &self.config.stages {
            let prompt = stage.prompt(source, previous.as_deref());
            previous = Some(self.run_stage(stage.name(), prompt, &mut trace).await?);
        }
        let draft = previous.unwrap_or_default();

        let final_text = if self.config.self_audit {
            let audit = self
                .run_stage("self-audit", prompts::self_audit(&draft), &mut trace)
                .await?;
            if audit.contains(prompts::FAILURE_SENTINEL) {
                return Ok(Attempt {
                    stages: trace,
                    outcome: Err(ParseError::Rejected),
                });
            }
            self.run_stage(
                "regenerate-json",
                prompts::regenerate_json(&draft, &audit, source.category),
                &mut trace,
            )
            .await?
        } else {
            draft
        };

        Ok(Attempt {
            stages: trace,
            outcome: parse_candidate(&final_text, source.category),
        })
    }

    /// Retries the whole chain until a valid question comes out or the
    /// attempt budget is spent.
    pub async fn generate(&self, index: usize, source: &Question) -> Result<Question, GenerationError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last = ParseError::NoJsonObject;

        for attempt in 1..=max_attempts {
            let Attempt { stages, outcome } = self.attempt(source).await?;
            match outcome {
                Ok(question) => {
                    log::info!("Generated question {index} on attempt {attempt}/{max_attempts}");
                    return Ok(question);
                }
                Err(err) => {
                    log::warn!("Question {index} attempt {attempt}/{max_attempts} discarded: {err}");
                    for stage in &stages {
                        log::debug!(
                            "discarded [{}] prompt: {}\nresponse: {}",
                            stage.stage_name,
                            stage.prompt_text,
                            stage.response_text
                        );
                    }
                    last = err;
                }
            }
        }

        Err(GenerationError::Exhausted {
            attempts: max_attempts,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::ai_helper::testing::ScriptedCompleter;

    const GOOD_JSON: &str =
        r#"{"question": "Lawan kata PANAS?", "answers": [{"text": "Dingin"}, {"text": "Hangat"}], "correctAnswerIndex": 0}"#;

    fn source() -> Question {
        Question::new(
            "Lawan kata TINGGI?".into(),
            vec![Answer::new("Rendah"), Answer::new("Besar")],
            0,
        )
    }

    fn generator(completer: Arc<ScriptedCompleter>, config: PipelineConfig) -> QuestionGenerator {
        QuestionGenerator::new(completer, config)
    }

    #[test]
    fn parse_reads_trailing_object() {
        let question = parse_candidate(&format!("Tentu, ini dia:\n{GOOD_JSON}"), None).unwrap();
        assert_eq!(question.text, "Lawan kata PANAS?");
        assert_eq!(question.correct_answer().unwrap().text, "Dingin");
    }

    #[test]
    fn parse_requires_answer_index() {
        let err = parse_candidate(r#"{"question": "Q", "answers": [{"text": "a"}]}"#, None).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("correctAnswerIndex")));
    }

    #[test]
    fn parse_checks_bounds_and_fields() {
        assert!(matches!(
            parse_candidate(r#"{"question": "Q", "answers": [{"text": "a"}], "correctAnswerIndex": 1}"#, None),
            Err(ParseError::AnswerIndexOutOfRange { index: 1, options: 1 })
        ));
        assert!(matches!(
            parse_candidate(r#"{"question": "Q", "answers": [{"text": "a"}], "correctAnswerIndex": -1}"#, None),
            Err(ParseError::AnswerIndexOutOfRange { index: -1, .. })
        ));
        assert!(matches!(
            parse_candidate(r#"{"question": " ", "answers": [{"text": "a"}], "correctAnswerIndex": 0}"#, None),
            Err(ParseError::MissingField("question"))
        ));
        assert!(matches!(
            parse_candidate(r#"{"question": "Q", "answers": [], "correctAnswerIndex": 0}"#, None),
            Err(ParseError::MissingField("answers"))
        ));
        assert!(matches!(
            parse_candidate(r#"{"question": "Q", "answers": "a", "correctAnswerIndex": 0}"#, None),
            Err(ParseError::Decode(_))
        ));
        assert!(matches!(parse_candidate("no json here", None), Err(ParseError::NoJsonObject)));
    }

    #[test]
    fn parse_requires_expected_category() {
        assert!(matches!(
            parse_candidate(GOOD_JSON, Some(Category::Antonym)),
            Err(ParseError::MissingField("category"))
        ));
        let with_category =
            r#"{"question": "Q", "answers": [{"text": "a"}], "correctAnswerIndex": 0, "category": "1"}"#;
        let question = parse_candidate(with_category, Some(Category::Antonym)).unwrap();
        assert_eq!(question.category, Some(Category::Antonym));
    }

    #[test]
    fn parse_ignores_unreadable_category() {
        let echoed_label =
            r#"{"question": "Q", "answers": [{"text": "a"}], "correctAnswerIndex": 0, "category": "General"}"#;
        let question = parse_candidate(echoed_label, None).unwrap();
        assert_eq!(question.text, "Q");
        assert_eq!(question.category, None);

        assert!(matches!(
            parse_candidate(echoed_label, Some(Category::Antonym)),
            Err(ParseError::MissingField("category"))
        ));
    }

    #[tokio::test]
    async fn rephrase_pipeline_single_stage() {
        let completer = Arc::new(ScriptedCompleter::new([format!("Berikut JSON:\n{GOOD_JSON}")]));
        let generator = generator(completer.clone(), PipelineConfig::rephrase(3));

        let attempt = generator.attempt(&source()).await.unwrap();
        assert_eq!(attempt.stages.len(), 1);
        assert_eq!(attempt.stages[0].stage_name, "rephrase-as-json");
        assert_eq!(attempt.outcome.unwrap().text, "Lawan kata PANAS?");
    }

    #[tokio::test]
    async fn audited_pipeline_chains_stage_outputs() {
        let completer = Arc::new(ScriptedCompleter::new([
            "Opposite of TALL?".to_string(),
            "Opposite of HOT? 1. Cold 2. Warm".to_string(),
            "Lawan kata PANAS? 1. Dingin 2. Hangat".to_string(),
            "<think>Dingin benar</think> Soal valid.".to_string(),
            GOOD_JSON.to_string(),
        ]));
        let generator = generator(completer.clone(), PipelineConfig::audited(3));

        let attempt = generator.attempt(&source()).await.unwrap();
        let names: Vec<_> = attempt.stages.iter().map(|s| s.stage_name).collect();
        assert_eq!(
            names,
            [
                "translate-to-english",
                "rewrite-in-english",
                "translate-to-indonesian",
                "self-audit",
                "regenerate-json"
            ]
        );
        assert!(attempt.outcome.is_ok());

        let prompts = completer.prompts();
        assert!(prompts[1].contains("Opposite of TALL?"));
        assert!(prompts[2].contains("Opposite of HOT?"));
        assert!(prompts[3].contains("Lawan kata PANAS? 1. Dingin"));
        assert!(prompts[4].contains("Lawan kata PANAS? 1. Dingin"));
        assert!(prompts[4].contains("Soal valid."));
    }

    #[tokio::test]
    async fn audit_sentinel_rejects_and_retries() {
        let completer = Arc::new(ScriptedCompleter::new([
            "en",
            "rewritten",
            "id",
            "Gambar tidak tersedia. <QuestionFailureFlag>TRUE</QuestionFailureFlag>",
            "en",
            "rewritten",
            "id",
            "ok",
            GOOD_JSON,
        ]));
        let generator = generator(completer.clone(), PipelineConfig::audited(2));

        let question = generator.generate(0, &source()).await.unwrap();
        assert_eq!(question.text, "Lawan kata PANAS?");
        assert_eq!(completer.calls(), 9);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let completer = Arc::new(ScriptedCompleter::new([
            r#"{"question": "Q", "answers": [{"text": "a"}]}"#,
            "tidak ada json",
            r#"{"question": "Q", "answers": [{"text": "a"}]}"#,
        ]));
        let generator = generator(completer.clone(), PipelineConfig::rephrase(3));

        let err = generator.generate(4, &source()).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Exhausted {
                attempts: 3,
                last: ParseError::MissingField("correctAnswerIndex")
            }
        ));
        assert_eq!(completer.calls(), 3);
    }

    #[tokio::test]
    async fn provider_error_is_not_retried() {
        let completer = Arc::new(ScriptedCompleter::default());
        completer.push_failure("503 Service Unavailable");
        completer.push_reply(GOOD_JSON);
        let generator = generator(completer.clone(), PipelineConfig::rephrase(3));

        let err = generator.generate(0, &source()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Provider(_)));
        assert_eq!(completer.calls(), 1);
    }
}
