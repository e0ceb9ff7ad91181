use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::knowledge_base::MatchResult;

/// Answer to a free-text question. Serialized with a `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AskResponse {
    NoMatch {
        message: String,
        total_time: f64,
    },
    ExactMatch {
        question: String,
        answer: String,
        answer_index: usize,
        explanation: String,
        topic: String,
        difficulty: String,
        confidence: f32,
        suggestions: Vec<Suggestion>,
        total_time: f64,
    },
    SemanticMatch(MatchedAnswer),
    ModelPrediction(MatchedAnswer),
}

impl AskResponse {
    pub fn status(&self) -> &'static str {
        match self {
            AskResponse::NoMatch { .. } => "no_match",
            AskResponse::ExactMatch { .. } => "exact_match",
            AskResponse::SemanticMatch(_) => "semantic_match",
            AskResponse::ModelPrediction(_) => "model_prediction",
        }
    }

    pub fn total_time(&self) -> f64 {
        match self {
            AskResponse::NoMatch { total_time, .. } | AskResponse::ExactMatch { total_time, .. } => *total_time,
            AskResponse::SemanticMatch(answer) | AskResponse::ModelPrediction(answer) => answer.total_time,
        }
    }
}

/// Best non-exact match, optionally re-scored by the prediction model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedAnswer {
    pub original_query: String,
    pub matched_question: String,
    pub match_score: f32,
    pub answer: String,
    pub answer_index: usize,
    pub confidence: f32,
    pub options: Vec<String>,
    pub explanation: String,
    pub topic: String,
    pub difficulty: String,
    pub suggestions: Vec<Suggestion>,
    pub total_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_probabilities: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub question: String,
    pub topic: String,
    pub score: f32,
}

impl From<&MatchResult<'_>> for Suggestion {
    fn from(m: &MatchResult<'_>) -> Self {
        Suggestion {
            question: m.record.question.clone(),
            topic: m.record.topic.clone(),
            score: m.score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub words: Vec<String>,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: usize,
    pub question: String,
    pub topic: String,
    pub difficulty: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStatus {
    pub has_json: bool,
    pub question_count: usize,
    pub json_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub query_count: u64,
    pub question_count: usize,
    pub indexed_words: usize,
    pub topics: Vec<String>,
}
