pub mod autocomplete;
pub mod config;
pub mod error;
pub mod knowledge_base;
pub mod predictor;
pub mod response;
pub mod service;
pub mod utils;

pub use autocomplete::AutocompleteIndex;
pub use config::Config;
pub use error::{DataLoadError, PredictorError};
pub use knowledge_base::{KnowledgeBase, MatchResult, MatchType, QuestionRecord, RawQuestion};
pub use predictor::{Prediction, Predictor, PredictorConfig, RemotePredictor};
pub use response::{AskResponse, AutocompleteResponse};
pub use service::QueryService;
