//! Word-chain session tracking
//!
//! Records the user's turns in a word-chain game and derives the
//! `WordChainTelemetry` consumed by the scorer. Each answer must start with the
//! last character of the current prompt and may not repeat a used word.

use crate::types::{WordChainTelemetry, DEFAULT_TARGET_ROUNDS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// One recorded user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub prompt: String,
    pub answer: String,
    pub latency_ms: u64,
    pub valid: bool,
}

/// Why an answer was not accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainRejection {
    #[error("answer is empty")]
    EmptyAnswer,

    #[error("answer must start with '{expected}'")]
    WrongStart { expected: char },

    #[error("'{0}' was already used")]
    AlreadyUsed(String),

    #[error("session already has all its rounds")]
    SessionComplete,
}

/// An in-progress word-chain session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordChainSession {
    prompt: String,
    target_rounds: u32,
    used: HashSet<String>,
    turns: Vec<Turn>,
}

impl WordChainSession {
    /// Start a session from an opening prompt
    pub fn new(prompt: impl Into<String>, target_rounds: u32) -> Self {
        let prompt = prompt.into();
        let mut used = HashSet::new();
        used.insert(prompt.clone());
        Self {
            prompt,
            target_rounds: target_rounds.max(1),
            used,
            turns: Vec::new(),
        }
    }

    /// Start a session with the default five rounds
    pub fn with_default_rounds(prompt: impl Into<String>) -> Self {
        Self::new(prompt, DEFAULT_TARGET_ROUNDS)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_used(&self, word: &str) -> bool {
        self.used.contains(word)
    }

    pub fn is_complete(&self) -> bool {
        self.turns.len() >= self.target_rounds as usize
    }

    /// Check an answer against the chain rules and record it when accepted
    pub fn submit(&mut self, answer: &str, latency_ms: u64) -> Result<(), ChainRejection> {
        if self.is_complete() {
            return Err(ChainRejection::SessionComplete);
        }

        let answer = answer.trim();
        let Some(first) = answer.chars().next() else {
            return Err(ChainRejection::EmptyAnswer);
        };

        if let Some(expected) = self.prompt.chars().last() {
            if first != expected {
                return Err(ChainRejection::WrongStart { expected });
            }
        }

        if self.used.contains(answer) {
            return Err(ChainRejection::AlreadyUsed(answer.to_string()));
        }

        self.used.insert(answer.to_string());
        self.turns.push(Turn {
            prompt: self.prompt.clone(),
            answer: answer.to_string(),
            latency_ms,
            valid: true,
        });
        Ok(())
    }

    /// Move on to the next prompt, marking it used
    pub fn advance(&mut self, next_prompt: impl Into<String>) {
        let next_prompt = next_prompt.into();
        self.used.insert(next_prompt.clone());
        self.prompt = next_prompt;
    }

    /// Record a turn judged elsewhere, valid or not
    pub fn record_turn(&mut self, turn: Turn) {
        if turn.valid {
            self.used.insert(turn.answer.clone());
        }
        self.turns.push(turn);
    }

    /// Derive telemetry from the recorded turns
    pub fn telemetry(&self) -> WordChainTelemetry {
        let rounds = self.turns.len();
        let (average_latency_ms, valid_answer_ratio) = if rounds == 0 {
            (0, 0.0)
        } else {
            let total = self
                .turns
                .iter()
                .fold(0u64, |acc, t| acc.saturating_add(t.latency_ms));
            let valid = self.turns.iter().filter(|t| t.valid).count();
            (total / rounds as u64, valid as f64 / rounds as f64)
        };

        WordChainTelemetry {
            rounds_completed: rounds as u32,
            average_latency_ms,
            valid_answer_ratio,
            target_rounds: self.target_rounds,
        }
    }

    /// Turn log as JSON, for storing alongside the telemetry
    pub fn details_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accepts_chained_answer() {
        let mut session = WordChainSession::with_default_rounds("사과");
        session.submit("과자", 1200).unwrap();

        assert_eq!(session.turns().len(), 1);
        assert!(session.is_used("과자"));
        assert!(session.turns()[0].valid);
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let mut session = WordChainSession::with_default_rounds("apple");

        assert_eq!(session.submit("   ", 100), Err(ChainRejection::EmptyAnswer));
        assert_eq!(
            session.submit("banana", 100),
            Err(ChainRejection::WrongStart { expected: 'e' })
        );
        session.submit("eagle", 900).unwrap();
        session.advance("elephant");
        assert_eq!(
            session.submit("eagle", 100),
            Err(ChainRejection::WrongStart { expected: 't' })
        );
        session.advance("treat");
        session.submit("tiger", 700).unwrap();
        session.advance("rabbit");
        session.submit("tree", 700).unwrap();
        session.advance("egret");
        assert_eq!(
            session.submit("tiger", 100),
            Err(ChainRejection::AlreadyUsed("tiger".to_string()))
        );

        assert_eq!(session.turns().len(), 3);
    }

    #[test]
    fn test_prompt_words_cannot_be_reused() {
        let mut session = WordChainSession::with_default_rounds("noon");
        assert_eq!(
            session.submit("noon", 100),
            Err(ChainRejection::AlreadyUsed("noon".to_string()))
        );
    }

    #[test]
    fn test_session_completes_at_target() {
        let mut session = WordChainSession::new("aa", 2);
        session.submit("ab", 500).unwrap();
        session.advance("bb");
        session.submit("bc", 500).unwrap();

        assert!(session.is_complete());
        assert_eq!(session.submit("cd", 500), Err(ChainRejection::SessionComplete));
    }

    #[test]
    fn test_telemetry_from_turns() {
        let mut session = WordChainSession::with_default_rounds("start");
        session.record_turn(Turn {
            prompt: "start".to_string(),
            answer: "tree".to_string(),
            latency_ms: 1000,
            valid: true,
        });
        session.record_turn(Turn {
            prompt: "tree".to_string(),
            answer: "zebra".to_string(),
            latency_ms: 2001,
            valid: false,
        });

        assert_eq!(
            session.telemetry(),
            WordChainTelemetry {
                rounds_completed: 2,
                average_latency_ms: 1500,
                valid_answer_ratio: 0.5,
                target_rounds: 5,
            }
        );
    }

    #[test]
    fn test_extreme_latencies_saturate() {
        let mut session = WordChainSession::with_default_rounds("start");
        for answer in ["tree", "eel"] {
            session.record_turn(Turn {
                prompt: "start".to_string(),
                answer: answer.to_string(),
                latency_ms: u64::MAX,
                valid: true,
            });
        }
        assert_eq!(session.telemetry().average_latency_ms, u64::MAX / 2);
    }

    #[test]
    fn test_empty_session_telemetry() {
        let session = WordChainSession::with_default_rounds("start");
        let telemetry = session.telemetry();
        assert_eq!(telemetry.rounds_completed, 0);
        assert_eq!(telemetry.average_latency_ms, 0);
        assert_eq!(telemetry.valid_answer_ratio, 0.0);
    }

    #[test]
    fn test_details_json() {
        let mut session = WordChainSession::with_default_rounds("bat");
        session.submit("tea", 640).unwrap();
        let details: serde_json::Value =
            serde_json::from_str(&session.details_json().unwrap()).unwrap();
        assert_eq!(details[0]["answer"], "tea");
        assert_eq!(details[0]["latency_ms"], 640);
    }
}
