use std::time::Duration;

use thiserror::Error;

use crate::visualizer::{DEFAULT_SEQUENCE, DEFAULT_STEP_DELAY};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `None` means quizzes use the built-in questions and grading is unavailable.
    pub chatgpt_api_key: Option<String>,
    pub chatgpt_timeout: Duration,
    pub question_count: usize,
    pub step_delay: Duration,
    pub sequence: Vec<u32>,
}

impl Config {
    /// Reads the process environment. Call `dotenv()` beforehand to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chatgpt_api_key = lookup("CHATGPT_API_KEY").filter(|key| !key.trim().is_empty());
        let chatgpt_timeout = Duration::from_secs(parse_number(&lookup, "CHATGPT_TIMEOUT_SECS", 15)?);
        let question_count = parse_number(&lookup, "QUIZ_QUESTION_COUNT", 20)? as usize;
        let step_delay = Duration::from_millis(parse_number(
            &lookup,
            "VISUALIZER_STEP_MS",
            DEFAULT_STEP_DELAY.as_millis() as u64,
        )?);

        let sequence = match lookup("VISUALIZER_SEQUENCE") {
            Some(raw) => parse_sequence(&raw).ok_or(ConfigError::Invalid {
                key: "VISUALIZER_SEQUENCE",
                value: raw,
            })?,
            None => DEFAULT_SEQUENCE.to_vec(),
        };

        Ok(Self {
            chatgpt_api_key,
            chatgpt_timeout,
            question_count,
            step_delay,
            sequence,
        })
    }
}

/// Positive integer setting with a default when unset.
fn parse_number<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_sequence(raw: &str) -> Option<Vec<u32>> {
    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    if values.is_empty() {
        return None;
    }
    Some(values)
}
