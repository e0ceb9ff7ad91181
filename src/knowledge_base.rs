//! Fixed question set with nearest-match lookup.
//!
//! Records are loaded once and never mutated. Lookup is a linear scan with
//! word-set Jaccard similarity, which is fine for tens to low hundreds of
//! records and is not meant to scale past that.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DataLoadError;
use crate::utils::{find_question_files, jaccard_of_sets, word_set};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.1;

const DEFAULT_EXPLANATION: &str = "No explanation provided.";
const DEFAULT_TOPIC: &str = "General";
const DEFAULT_DIFFICULTY: &str = "Medium";

/// A question entry as it appears in the JSON source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "correctIndex")]
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct QuestionRecord {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub correct_option: String,
    pub explanation: String,
    pub topic: String,
    pub difficulty: String,
    pub keywords: Vec<String>,
    normalized_question: String,
    search_terms: FxHashSet<String>,
}

impl QuestionRecord {
    fn from_raw(index: usize, raw: RawQuestion) -> Result<Self, DataLoadError> {
        let question = raw.question.trim().to_string();
        if question.is_empty() {
            return Err(DataLoadError::InvalidRecord {
                index,
                reason: "question text is empty".to_string(),
            });
        }

        let correct_option = raw
            .options
            .get(raw.correct_answer)
            .cloned()
            .ok_or_else(|| DataLoadError::InvalidRecord {
                index,
                reason: format!(
                    "correct_answer {} is out of range for {} options",
                    raw.correct_answer,
                    raw.options.len()
                ),
            })?;

        let topic = or_default(raw.topic, DEFAULT_TOPIC);
        let keywords = raw.keywords.unwrap_or_default();
        let combined = format!("{} {} {}", question, keywords.join(" "), topic);

        Ok(QuestionRecord {
            normalized_question: question.to_lowercase(),
            search_terms: word_set(&combined),
            question,
            options: raw.options,
            correct_index: raw.correct_answer,
            correct_option,
            explanation: or_default(raw.explanation, DEFAULT_EXPLANATION),
            topic,
            difficulty: or_default(raw.difficulty, DEFAULT_DIFFICULTY),
            keywords,
        })
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Semantic,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub record: &'a QuestionRecord,
    pub match_type: MatchType,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    records: Vec<QuestionRecord>,
    threshold: f32,
}

impl KnowledgeBase {
    /// Normalizes raw entries, failing on the first malformed one.
    pub fn from_raw(raw: Vec<RawQuestion>) -> Result<Self, DataLoadError> {
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(index, item)| QuestionRecord::from_raw(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(KnowledgeBase {
            records,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        })
    }

    /// Loads a JSON array of questions from a file, or every `.json` file
    /// under a directory in path order.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        info!("Loading knowledge base from {:?}", path);

        if !path.exists() {
            return Err(DataLoadError::NotFound(path.to_path_buf()));
        }

        let files = if path.is_dir() {
            find_question_files(path).map_err(|source| DataLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            vec![path.to_path_buf()]
        };

        let mut raw = Vec::new();
        for file in &files {
            raw.extend(read_raw_questions(file)?);
        }

        let kb = Self::from_raw(raw)?;
        info!("Loaded {} questions", kb.len());
        info!("Topics: {}", kb.topics().join(", "));
        Ok(kb)
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct topics in first-seen order.
    pub fn topics(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        self.records
            .iter()
            .filter(|r| seen.insert(r.topic.as_str()))
            .map(|r| r.topic.clone())
            .collect()
    }

    pub fn find_similar_questions(&self, query: &str, top_k: usize) -> Vec<MatchResult<'_>> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let query_lower = query.to_lowercase();
        if let Some(record) = self
            .records
            .iter()
            .find(|r| r.normalized_question == query_lower)
        {
            return vec![MatchResult {
                record,
                match_type: MatchType::Exact,
                score: 1.0,
            }];
        }

        let query_terms = word_set(query);
        let mut matches: Vec<MatchResult<'_>> = self
            .records
            .iter()
            .map(|record| MatchResult {
                record,
                match_type: MatchType::Semantic,
                score: jaccard_of_sets(&query_terms, &record.search_terms),
            })
            .filter(|m| m.score > self.threshold)
            .collect();

        // Stable sort keeps load order among equal scores.
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);

        debug!("{} semantic matches for {:?}", matches.len(), query);
        matches
    }
}

fn read_raw_questions(path: &Path) -> Result<Vec<RawQuestion>, DataLoadError> {
    let content = fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| DataLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    pub(crate) fn raw(question: &str, options: &[&str], correct: usize, topic: &str, keywords: &[&str]) -> RawQuestion {
        RawQuestion {
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct,
            explanation: None,
            topic: Some(topic.to_string()),
            difficulty: None,
            keywords: Some(keywords.iter().map(|k| k.to_string()).collect()),
        }
    }

    pub(crate) fn sample_base() -> KnowledgeBase {
        KnowledgeBase::from_raw(vec![
            raw(
                "What is the time complexity of binary search?",
                &["O(1)", "O(log n)", "O(n)", "O(n^2)"],
                1,
                "Search",
                &["binary search", "logarithmic"],
            ),
            raw(
                "What is the worst case time complexity of quick sort?",
                &["O(n log n)", "O(n^2)", "O(n)", "O(log n)"],
                1,
                "Sorting",
                &["quick sort", "pivot"],
            ),
            raw(
                "Which data structure uses a hash function to map keys?",
                &["Array", "Hash table", "Stack", "Queue"],
                1,
                "Hashing",
                &["hash table", "collision"],
            ),
            raw(
                "What is the space complexity of merge sort?",
                &["O(1)", "O(log n)", "O(n)", "O(n^2)"],
                2,
                "Sorting",
                &["merge sort", "auxiliary space"],
            ),
        ])
        .expect("sample base is valid")
    }

    #[test]
    fn test_defaults_applied_on_load() {
        let kb = KnowledgeBase::from_raw(vec![RawQuestion {
            question: "  What is a stack?  ".to_string(),
            options: vec!["LIFO".to_string(), "FIFO".to_string()],
            correct_answer: 0,
            explanation: Some("   ".to_string()),
            topic: None,
            difficulty: None,
            keywords: None,
        }])
        .unwrap();

        let record = &kb.records()[0];
        assert_eq!(record.question, "What is a stack?");
        assert_eq!(record.correct_option, "LIFO");
        assert_eq!(record.explanation, DEFAULT_EXPLANATION);
        assert_eq!(record.topic, "General");
        assert_eq!(record.difficulty, "Medium");
    }

    #[test]
    fn test_out_of_range_correct_answer_is_rejected() {
        let err = KnowledgeBase::from_raw(vec![raw("What is a queue?", &["FIFO", "LIFO"], 2, "Queues", &[])])
            .unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn test_empty_question_is_rejected() {
        let err = KnowledgeBase::from_raw(vec![
            raw("What is a queue?", &["FIFO", "LIFO"], 0, "Queues", &[]),
            raw("   ", &["a", "b"], 0, "Queues", &[]),
        ])
        .unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidRecord { index: 1, .. }));
    }

    #[test]
    fn test_exact_match_short_circuits() {
        let kb = sample_base();
        let matches = kb.find_similar_questions("  what is the TIME complexity of binary search?  ", 5);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_type, MatchType::Exact);
        assert_eq!(matches[0].score, 1.0);
        assert_eq!(matches[0].record.correct_option, "O(log n)");
    }

    #[test]
    fn test_duplicate_question_text_first_loaded_wins() {
        let kb = KnowledgeBase::from_raw(vec![
            raw("What is a heap?", &["tree", "list"], 0, "Heaps", &[]),
            raw("What is a heap?", &["tree", "list"], 1, "Heaps", &[]),
        ])
        .unwrap();

        let matches = kb.find_similar_questions("what is a heap?", 5);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.correct_index, 0);
    }

    #[test]
    fn test_semantic_matches_sorted_and_thresholded() {
        let kb = sample_base();
        let matches = kb.find_similar_questions("time complexity binary search", 5);

        assert!(!matches.is_empty());
        assert_eq!(matches[0].record.topic, "Search");
        assert!(matches.iter().all(|m| m.match_type == MatchType::Semantic));
        assert!(matches.iter().all(|m| m.score > DEFAULT_SIMILARITY_THRESHOLD));
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_top_k_limits_results() {
        let kb = sample_base();
        let matches = kb.find_similar_questions("complexity sort", 1);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_ties_keep_load_order() {
        let kb = KnowledgeBase::from_raw(vec![
            raw("alpha beta", &["x", "y"], 0, "One", &[]),
            raw("alpha gamma", &["x", "y"], 0, "One", &[]),
        ])
        .unwrap();

        let matches = kb.find_similar_questions("alpha", 5);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].score, matches[1].score);
        assert_eq!(matches[0].record.question, "alpha beta");
        assert_eq!(matches[1].record.question, "alpha gamma");
    }

    #[test]
    fn test_blank_query_and_empty_base() {
        let kb = sample_base();
        assert!(kb.find_similar_questions("", 5).is_empty());
        assert!(kb.find_similar_questions("   ", 5).is_empty());

        let empty = KnowledgeBase::from_raw(Vec::new()).unwrap();
        assert!(empty.find_similar_questions("binary search", 5).is_empty());
    }

    #[test]
    fn test_null_optional_fields_take_defaults() {
        let raw: Vec<RawQuestion> = serde_json::from_str(
            r#"[{"question":"What is a heap?","options":["tree","list"],"correct_answer":0,"keywords":null,"explanation":null,"topic":null}]"#,
        )
        .unwrap();
        let kb = KnowledgeBase::from_raw(raw).unwrap();

        let record = &kb.records()[0];
        assert!(record.keywords.is_empty());
        assert_eq!(record.explanation, DEFAULT_EXPLANATION);
        assert_eq!(record.topic, "General");
        assert_eq!(kb.find_similar_questions("What is a heap?", 5).len(), 1);
    }

    #[test]
    fn test_score_equal_to_threshold_is_discarded() {
        // {alpha, b, c, d, e, f} vs {alpha, g, h, i, j}: 1 / 10
        let kb = KnowledgeBase::from_raw(vec![raw("alpha b c d e", &["x", "y"], 0, "f", &[])]).unwrap();
        assert!(kb.find_similar_questions("alpha g h i j", 5).is_empty());
    }

    #[test]
    fn test_score_just_above_threshold_is_kept() {
        // {alpha, b, c, d, e, f} vs {alpha, g, h, i}: 1 / 9
        let kb = KnowledgeBase::from_raw(vec![raw("alpha b c d e", &["x", "y"], 0, "f", &[])]).unwrap();
        let matches = kb.find_similar_questions("alpha g h i", 5);

        assert_eq!(matches.len(), 1);
        assert!((matches[0].score - 1.0 / 9.0).abs() < 1e-6);
        assert_eq!(matches[0].match_type, MatchType::Semantic);
    }

    #[test]
    fn test_unrelated_query_has_no_matches() {
        let kb = sample_base();
        assert!(kb.find_similar_questions("photosynthesis chlorophyll", 5).is_empty());
    }

    #[test]
    fn test_topics_in_first_seen_order() {
        let kb = sample_base();
        assert_eq!(kb.topics(), vec!["Search", "Sorting", "Hashing"]);
    }

    #[test]
    fn test_load_from_file_and_directory() -> Result<()> {
        let dir = tempdir()?;
        let first = serde_json::to_string(&vec![raw("What is a trie?", &["tree", "graph"], 0, "Tries", &[])])?;
        let second = serde_json::to_string(&vec![raw("What is a deque?", &["queue", "set"], 0, "Queues", &[])])?;

        let mut file = File::create(dir.path().join("a.json"))?;
        write!(file, "{first}")?;
        let mut file = File::create(dir.path().join("b.json"))?;
        write!(file, "{second}")?;

        let kb = KnowledgeBase::load(dir.path().join("a.json"))?;
        assert_eq!(kb.len(), 1);

        let kb = KnowledgeBase::load(dir.path())?;
        assert_eq!(kb.len(), 2);
        assert_eq!(kb.records()[0].question, "What is a trie?");

        Ok(())
    }

    #[test]
    fn test_load_failures() -> Result<()> {
        let dir = tempdir()?;
        let missing = KnowledgeBase::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, DataLoadError::NotFound(_)));

        let bad = dir.path().join("bad.json");
        let mut file = File::create(&bad)?;
        write!(file, "{{ not json")?;
        let parse = KnowledgeBase::load(&bad).unwrap_err();
        assert!(matches!(parse, DataLoadError::Parse { .. }));

        Ok(())
    }
}
