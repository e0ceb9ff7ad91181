use lazy_static::lazy_static;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

use crate::knowledge_base::QuestionRecord;
use crate::response::AutocompleteResponse;
use crate::utils::tokenize;

pub const DEFAULT_FALLBACK_POOL: usize = 50;

lazy_static! {
    static ref STOP_WORDS: FxHashSet<&'static str> = {
        let words = vec!["what", "is", "the", "a", "an", "in", "for", "of", "to", "and", "or"];
        words.into_iter().collect()
    };

    /// Hand-authored follow-up words for common DSA terms.
    static ref CONTEXT_TABLE: FxHashMap<&'static str, &'static [&'static str]> = {
        let entries: [(&'static str, &'static [&'static str]); 10] = [
            ("time", &["complexity", "space", "worst", "best", "average"]),
            ("space", &["complexity", "worst", "best", "average"]),
            ("hash", &["table", "function", "collision", "map"]),
            ("array", &["list", "size", "index", "element", "resizing"]),
            ("worst", &["case", "time", "complexity"]),
            ("best", &["case", "time", "complexity"]),
            ("binary", &["search", "tree", "heap"]),
            ("linked", &["list", "node"]),
            ("merge", &["sort", "algorithm"]),
            ("quick", &["sort", "algorithm"]),
        ];
        entries.into_iter().collect()
    };
}

/// Word-frequency index over question text and keywords.
///
/// Built once from a knowledge base snapshot and never updated in place;
/// a changed knowledge base gets a freshly built index.
#[derive(Debug, Clone)]
pub struct AutocompleteIndex {
    /// (word, count) in first-seen order, stop words removed.
    word_frequency: Vec<(String, u64)>,
    questions: Vec<String>,
    fallback_pool: usize,
}

impl AutocompleteIndex {
    pub fn build(records: &[QuestionRecord]) -> Self {
        info!("Building autocomplete index...");

        let mut positions: FxHashMap<String, usize> = FxHashMap::default();
        let mut counts: Vec<(String, u64)> = Vec::new();
        let mut count_word = |word: String| match positions.get(&word) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(word.clone(), counts.len());
                counts.push((word, 1));
            }
        };

        for record in records {
            tokenize(&record.question).into_iter().for_each(&mut count_word);
            for keyword in &record.keywords {
                tokenize(keyword).into_iter().for_each(&mut count_word);
            }
        }

        counts.retain(|(word, _)| !STOP_WORDS.contains(word.as_str()));
        info!("Indexed {} unique words", counts.len());

        AutocompleteIndex {
            word_frequency: counts,
            questions: records.iter().map(|r| r.question.clone()).collect(),
            fallback_pool: DEFAULT_FALLBACK_POOL,
        }
    }

    pub fn with_fallback_pool(mut self, fallback_pool: usize) -> Self {
        self.fallback_pool = fallback_pool;
        self
    }

    pub fn word_frequency(&self) -> &[(String, u64)] {
        &self.word_frequency
    }

    pub fn frequency(&self, word: &str) -> Option<u64> {
        self.word_frequency
            .iter()
            .find(|(w, _)| w == word)
            .map(|&(_, count)| count)
    }

    pub fn len(&self) -> usize {
        self.word_frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_frequency.is_empty()
    }

    /// Completes the word being typed, or suggests the next word once the
    /// input ends with a space.
    pub fn predict_next_words(&self, partial_text: &str, top_k: usize) -> Vec<String> {
        if partial_text.chars().count() < 2 {
            return Vec::new();
        }

        let lower = partial_text.to_lowercase();
        let last_word = lower.split_whitespace().last().unwrap_or("");

        if partial_text.ends_with(' ') {
            self.get_next_word_suggestions(last_word, top_k)
        } else {
            self.get_word_completions(last_word, top_k)
        }
    }

    pub fn get_word_completions(&self, partial_word: &str, top_k: usize) -> Vec<String> {
        if partial_word.chars().count() < 2 {
            return Vec::new();
        }

        let partial_word = partial_word.to_lowercase();
        let mut candidates: Vec<&(String, u64)> = self
            .word_frequency
            .iter()
            .filter(|(word, _)| word.starts_with(&partial_word) && *word != partial_word)
            .collect();

        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates
            .into_iter()
            .take(top_k)
            .map(|(word, _)| word.clone())
            .collect()
    }

    pub fn get_next_word_suggestions(&self, previous_word: &str, top_k: usize) -> Vec<String> {
        if let Some(next) = CONTEXT_TABLE.get(previous_word.to_lowercase().as_str()) {
            return next.iter().take(top_k).map(|w| w.to_string()).collect();
        }

        // Generic fallback: the most frequent longer terms in the corpus.
        let mut common: Vec<&(String, u64)> = self
            .word_frequency
            .iter()
            .filter(|(word, _)| word.chars().count() > 3)
            .collect();

        common.sort_by(|a, b| b.1.cmp(&a.1));
        common
            .into_iter()
            .take(self.fallback_pool.min(top_k))
            .map(|(word, _)| word.clone())
            .collect()
    }

    /// Whole questions containing the input as a case-insensitive substring,
    /// in load order.
    pub fn get_question_suggestions(&self, partial_text: &str, top_k: usize) -> Vec<String> {
        if partial_text.chars().count() < 3 {
            return Vec::new();
        }

        let partial_lower = partial_text.to_lowercase();
        self.questions
            .iter()
            .filter(|q| q.to_lowercase().contains(&partial_lower))
            .take(top_k)
            .cloned()
            .collect()
    }

    pub fn suggest(&self, text: &str, word_limit: usize, question_limit: usize) -> AutocompleteResponse {
        AutocompleteResponse {
            words: self.predict_next_words(text, word_limit),
            questions: self.get_question_suggestions(text, question_limit),
        }
    }
}
