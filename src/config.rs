use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::quiz::generator::PipelineConfig;

const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "llama3-8b-8192";
const DEFAULT_ORIGINS: &str = "https://wpt-iqtest.netlify.app,http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: Url,
    pub model: String,
    pub timeout: Duration,
    pub question_bank: PathBuf,
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub pipeline: PipelineConfig,
    pub total_questions: u32,
}

impl Config {
    /// Reads the process environment. Call `dotenv()` first to pick up a
    /// local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let api_key = lookup("GROQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingVar("GROQ_API_KEY"))?;

        let max_attempts: usize = parse("GENERATION_MAX_ATTEMPTS", var("GENERATION_MAX_ATTEMPTS", "3"))?;
        if max_attempts == 0 {
            return Err(invalid("GENERATION_MAX_ATTEMPTS", "0", "must be at least 1"));
        }
        let pipeline = match var("GENERATION_PIPELINE", "audited").as_str() {
            "audited" => PipelineConfig::audited(max_attempts),
            "rephrase" => PipelineConfig::rephrase(max_attempts),
            other => return Err(invalid("GENERATION_PIPELINE", other, "expected `audited` or `rephrase`")),
        };

        let total_questions: u32 = parse("TOTAL_QUESTIONS", var("TOTAL_QUESTIONS", "47"))?;
        if total_questions == 0 {
            return Err(invalid("TOTAL_QUESTIONS", "0", "must be at least 1"));
        }

        Ok(Self {
            api_key,
            api_url: parse("LLM_API_URL", var("LLM_API_URL", DEFAULT_API_URL))?,
            model: var("LLM_MODEL", DEFAULT_MODEL),
            timeout: Duration::from_secs(parse("LLM_TIMEOUT_SECS", var("LLM_TIMEOUT_SECS", "60"))?),
            question_bank: PathBuf::from(var("QUESTION_BANK", "questions.json")),
            bind_addr: parse("BIND_ADDR", var("BIND_ADDR", "127.0.0.1:5001"))?,
            static_dir: PathBuf::from(var("STATIC_DIR", ".")),
            allowed_origins: var("ALLOWED_ORIGINS", DEFAULT_ORIGINS)
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            pipeline,
            total_questions,
        })
    }
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidVar {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value.trim().parse().map_err(|e: T::Err| invalid(name, &value, e))
}
