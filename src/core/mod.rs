pub mod executor;
pub mod export;
pub mod markdown;
pub mod prompts;
pub mod summarizer;

pub use crate::domain::model::{
    AttemptEvent, BookSummary, ChapterRef, ChapterSummary, ChapterSummaryResult, ModelProfile,
    ProgressState,
};
pub use crate::domain::ports::{BookSource, CredentialSource, ProgressSink, Storage, Transport};
pub use crate::utils::error::Result;
