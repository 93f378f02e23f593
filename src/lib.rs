pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;
pub use config::SummarizerConfig;

pub use adapters::{epub::EpubBook, http::ReqwestTransport, storage::LocalStorage};
pub use core::executor::{RequestExecutor, RetryPolicy};
pub use core::markdown::render;
pub use core::summarizer::{BookSummarizer, SummarizerSettings};
pub use utils::error::{DigestError, Result};
