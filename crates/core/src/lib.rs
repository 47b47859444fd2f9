pub mod answer;
pub mod audit;
pub mod config;
pub mod errors;
pub mod intent;
pub mod rows;

pub use answer::{default_datasets, Answerer, Dataset, Reply, MAX_LISTED_ROWS, NO_MATCH_BODY};
pub use audit::QueryLogRecord;
pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use errors::ApplicationError;
pub use intent::{
    FuzzyMatcher, IntentResolver, IntentRouter, PhraseTable, Resolution, ResolutionStrategy,
    ScoredMatch, TableEntry, TableError,
};
pub use rows::{InMemoryRowSource, Row, RowFilter, RowSink, RowSource, RowSourceError};
