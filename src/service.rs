use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::autocomplete::AutocompleteIndex;
use crate::config::Config;
use crate::error::DataLoadError;
use crate::knowledge_base::{KnowledgeBase, MatchResult, MatchType, QuestionRecord};
use crate::predictor::{Prediction, Predictor};
use crate::response::{
    AskResponse, AssetStatus, AutocompleteResponse, MatchedAnswer, QuestionSummary, ServiceStats, Suggestion,
};
use crate::utils::ensure_dir;

const NO_MATCH_MESSAGE: &str = "No matching questions found";

/// Knowledge base and the autocomplete index built from it. Never mutated
/// after construction.
pub struct Snapshot {
    pub kb: KnowledgeBase,
    pub index: AutocompleteIndex,
}

impl Snapshot {
    pub fn build(kb: KnowledgeBase, config: &Config) -> Self {
        let kb = kb.with_threshold(config.similarity_threshold);
        let index = AutocompleteIndex::build(kb.records()).with_fallback_pool(config.fallback_pool);
        Snapshot { kb, index }
    }
}

/// Answers questions and autocompletes input against the current snapshot.
///
/// Reloads build a complete new snapshot and swap it in; in-flight calls
/// keep the snapshot they started with.
pub struct QueryService {
    snapshot: RwLock<Arc<Snapshot>>,
    predictor: Option<Box<dyn Predictor>>,
    query_count: AtomicU64,
    config: Config,
}

impl QueryService {
    pub fn new(kb: KnowledgeBase, config: Config) -> Self {
        QueryService {
            snapshot: RwLock::new(Arc::new(Snapshot::build(kb, &config))),
            predictor: None,
            query_count: AtomicU64::new(0),
            config,
        }
    }

    pub fn load(config: Config) -> Result<Self, DataLoadError> {
        let kb = KnowledgeBase::load(&config.data_path)?;
        Ok(Self::new(kb, config))
    }

    pub fn with_predictor(mut self, predictor: Box<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap(&self, snapshot: Snapshot) {
        let questions = snapshot.kb.len();
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        info!("Swapped in knowledge base with {} questions", questions);
    }

    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    pub fn answer_question(&self, query: &str) -> AskResponse {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let snapshot = self.snapshot();
        let matches = snapshot.kb.find_similar_questions(query, self.config.match_limit);

        let Some(best) = matches.first() else {
            debug!("no_match for {:?}", query);
            return AskResponse::NoMatch {
                message: NO_MATCH_MESSAGE.to_string(),
                total_time: start.elapsed().as_secs_f64(),
            };
        };

        let suggestions: Vec<Suggestion> = matches
            .iter()
            .skip(1)
            .take(self.config.suggestion_limit)
            .map(Suggestion::from)
            .collect();
        let record = best.record;

        let response = match best.match_type {
            MatchType::Exact => AskResponse::ExactMatch {
                question: record.question.clone(),
                answer: record.correct_option.clone(),
                answer_index: record.correct_index,
                explanation: record.explanation.clone(),
                topic: record.topic.clone(),
                difficulty: record.difficulty.clone(),
                confidence: 1.0,
                suggestions,
                total_time: start.elapsed().as_secs_f64(),
            },
            MatchType::Semantic => {
                let mut answer = semantic_answer(query, best, suggestions);
                match self.model_prediction(record) {
                    Some(prediction) => {
                        apply_prediction(&mut answer, record, prediction);
                        answer.total_time = start.elapsed().as_secs_f64();
                        AskResponse::ModelPrediction(answer)
                    }
                    None => {
                        answer.total_time = start.elapsed().as_secs_f64();
                        AskResponse::SemanticMatch(answer)
                    }
                }
            }
        };

        debug!("{} for {:?} in {:.6}s", response.status(), query, response.total_time());
        response
    }

    /// Asks the model, if one is ready, to answer the matched record.
    /// Failures are logged and treated as "no prediction".
    fn model_prediction(&self, record: &QuestionRecord) -> Option<Prediction> {
        let predictor = self.predictor.as_ref().filter(|p| p.is_ready())?;

        let result = predictor
            .predict(&record.question, &record.options)
            .and_then(|prediction| prediction.validate(record.options.len()).map(|_| prediction));

        match result {
            Ok(prediction) => Some(prediction),
            Err(e) => {
                warn!("Prediction model failed, using semantic match: {}", e);
                None
            }
        }
    }

    pub fn autocomplete(&self, text: &str) -> AutocompleteResponse {
        self.snapshot()
            .index
            .suggest(text, self.config.word_limit, self.config.question_limit)
    }

    pub fn list_questions(&self) -> Vec<QuestionSummary> {
        self.snapshot()
            .kb
            .records()
            .iter()
            .enumerate()
            .map(|(i, r)| QuestionSummary {
                id: i + 1,
                question: r.question.clone(),
                topic: r.topic.clone(),
                difficulty: r.difficulty.clone(),
                options: r.options.clone(),
            })
            .collect()
    }

    /// Rebuilds from `path` and swaps the result in. On failure the current
    /// snapshot stays in place.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<usize, DataLoadError> {
        let kb = KnowledgeBase::load(path)?;
        let count = kb.len();
        self.swap(Snapshot::build(kb, &self.config));
        Ok(count)
    }

    /// Validates a new question source, stores it in the upload directory
    /// and starts serving it.
    pub fn install_source(&self, source: impl AsRef<Path>) -> Result<usize> {
        let source = source.as_ref();
        let kb = KnowledgeBase::load(source)?;

        let content = fs::read(source).with_context(|| format!("Failed to read {:?}", source))?;
        let target = self.config.installed_source_path();
        ensure_dir(&self.config.upload_dir)?;

        let mut temp_file = NamedTempFile::new_in(&self.config.upload_dir)?;
        temp_file.write_all(&content)?;
        temp_file
            .persist(&target)
            .with_context(|| format!("Failed to store question source at {:?}", target))?;
        info!("Stored question source at {:?}", target);

        let count = kb.len();
        self.swap(Snapshot::build(kb, &self.config));
        Ok(count)
    }

    pub fn asset_status(&self) -> AssetStatus {
        let path = self.config.installed_source_path();
        if !path.is_file() {
            return AssetStatus {
                has_json: false,
                question_count: 0,
                json_path: None,
            };
        }

        let question_count = match KnowledgeBase::load(&path) {
            Ok(kb) => kb.len(),
            Err(e) => {
                warn!("Installed question source is unreadable: {}", e);
                0
            }
        };

        AssetStatus {
            has_json: true,
            question_count,
            json_path: Some(path),
        }
    }

    pub fn stats(&self) -> ServiceStats {
        let snapshot = self.snapshot();
        ServiceStats {
            query_count: self.query_count(),
            question_count: snapshot.kb.len(),
            indexed_words: snapshot.index.len(),
            topics: snapshot.kb.topics(),
        }
    }
}

fn semantic_answer(query: &str, best: &MatchResult<'_>, suggestions: Vec<Suggestion>) -> MatchedAnswer {
    let record = best.record;
    MatchedAnswer {
        original_query: query.to_string(),
        matched_question: record.question.clone(),
        match_score: best.score,
        answer: record.correct_option.clone(),
        answer_index: record.correct_index,
        confidence: best.score,
        options: record.options.clone(),
        explanation: record.explanation.clone(),
        topic: record.topic.clone(),
        difficulty: record.difficulty.clone(),
        suggestions,
        total_time: 0.0,
        all_probabilities: None,
        inference_time: None,
    }
}

fn apply_prediction(answer: &mut MatchedAnswer, record: &QuestionRecord, prediction: Prediction) {
    answer.answer = record.options[prediction.predicted_index].clone();
    answer.answer_index = prediction.predicted_index;
    answer.confidence = prediction.confidence;
    answer.all_probabilities = Some(prediction.all_probabilities);
    answer.inference_time = Some(prediction.inference_time);
}
