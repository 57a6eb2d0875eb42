pub mod ai_helper;
pub mod extract;
pub mod feedback;
pub mod generator;
pub mod prompts;
pub mod scoring;
pub mod session;

use std::fmt;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    pub answers: Vec<Answer>,
    #[serde(rename = "correctAnswerIndex")]
    pub correct_answer_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Question {
    pub fn new(text: String, answers: Vec<Answer>, correct_answer_index: usize) -> Self {
        Self {
            text,
            answers,
            correct_answer_index,
            category: None,
        }
    }

    #[cfg(test)]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn correct_answer(&self) -> Option<&Answer> {
        self.answers.get(self.correct_answer_index)
    }

    fn check(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        if self.answers.is_empty() {
            return Err("answer list is empty".to_string());
        }
        if self.correct_answer().is_none() {
            return Err(format!(
                "correctAnswerIndex {} is out of range for {} answers",
                self.correct_answer_index,
                self.answers.len()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Answer {
    pub text: String,
}

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// The nine WPT-style question categories. Serialized by their identifier
/// ("1" through "9").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "CategoryId", into = "String")]
pub enum Category {
    Antonym,
    NumberSeries,
    OddOneOut,
    DeductiveReasoning,
    SentenceLogic,
    ProblemSolving,
    MeaningInterpretation,
    Matching,
    GeneralKnowledge,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Antonym,
        Category::NumberSeries,
        Category::OddOneOut,
        Category::DeductiveReasoning,
        Category::SentenceLogic,
        Category::ProblemSolving,
        Category::MeaningInterpretation,
        Category::Matching,
        Category::GeneralKnowledge,
    ];

    pub fn id(self) -> u8 {
        match self {
            Category::Antonym => 1,
            Category::NumberSeries => 2,
            Category::OddOneOut => 3,
            Category::DeductiveReasoning => 4,
            Category::SentenceLogic => 5,
            Category::ProblemSolving => 6,
            Category::MeaningInterpretation => 7,
            Category::Matching => 8,
            Category::GeneralKnowledge => 9,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Antonym => "Vocabulary/Verbal Reasoning (Antonym)",
            Category::NumberSeries => "Numerical Reasoning (Number Series)",
            Category::OddOneOut => "Logical Reasoning (Odd One Out)",
            Category::DeductiveReasoning => "Logical Reasoning (Deductive Reasoning)",
            Category::SentenceLogic => "Verbal Reasoning (Sentence Logic)",
            Category::ProblemSolving => "Numerical Reasoning (Problem Solving)",
            Category::MeaningInterpretation => "Verbal Reasoning (Meaning interpretation)",
            Category::Matching => "Perceptual Speed (Matching)",
            Category::GeneralKnowledge => "General Knowledge",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.to_string()
    }
}

/// Bank files and clients send the identifier either as a string or a number.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum CategoryId {
    Text(String),
    Number(u64),
}

impl TryFrom<CategoryId> for Category {
    type Error = String;

    fn try_from(value: CategoryId) -> Result<Self, Self::Error> {
        let id = match &value {
            CategoryId::Text(text) => text.trim().parse::<u8>().ok(),
            CategoryId::Number(number) => u8::try_from(*number).ok(),
        };
        id.and_then(Category::from_id).ok_or_else(|| match value {
            CategoryId::Text(text) => format!("unknown category {text:?}"),
            CategoryId::Number(number) => format!("unknown category {number}"),
        })
    }
}

/// One answered question as reported by the test client.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TestResponse {
    #[serde(rename = "question", alias = "questionText")]
    pub question_text: String,
    #[serde(rename = "answer", alias = "answerText")]
    pub answer_text: String,
    #[serde(rename = "correct", alias = "isCorrect")]
    pub is_correct: bool,
    #[serde(default, deserialize_with = "lenient_category")]
    pub category: Option<Category>,
}

/// Clients label uncategorised answers with free text such as "Unknown";
/// anything that is not one of the nine identifiers counts as no category.
pub(crate) fn lenient_category<'de, D>(deserializer: D) -> Result<Option<Category>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = <Option<serde_json::Value> as serde::Deserialize>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value::<Category>(value).ok()))
}

#[derive(serde::Deserialize)]
struct WrappedBank {
    questions: Vec<Question>,
}

/// Read-only source questions, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, ConfigError> {
        for (index, question) in questions.iter().enumerate() {
            question
                .check()
                .map_err(|reason| ConfigError::BankRecord { index, reason })?;
        }
        Ok(Self { questions })
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let questions: Vec<Question> = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            serde_json::from_value::<WrappedBank>(value)?.questions
        };
        Self::new(questions)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::BankRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
