use crate::domain::model::{ChapterRef, ChatRequest, ProgressState, TransportResponse};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Network access for chat-completion calls.
///
/// Implementations return `Ok` for any HTTP response, successful or not; the
/// executor classifies status codes. `Err` is reserved for failures where no
/// response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        credential: &str,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<TransportResponse>;
}

/// An opened book.
#[async_trait]
pub trait BookSource: Send + Sync {
    fn title(&self) -> &str;

    fn author(&self) -> Option<&str>;

    fn table_of_contents(&self) -> &[ChapterRef];

    /// Plain text of the chapter behind `href`, markup already stripped.
    async fn load_chapter_text(&self, href: &str) -> Result<String>;

    /// Number of sections in reading order.
    fn section_count(&self) -> usize;

    async fn load_section_text(&self, index: usize) -> Result<String>;
}

pub trait ProgressSink: Send + Sync {
    fn update(&self, state: &ProgressState);

    /// Called once the run is over and the indicator can be hidden.
    fn finish(&self) {}
}

pub trait CredentialSource: Send + Sync {
    /// Returns `None` when the user declines to provide a credential.
    fn acquire(&self) -> Option<String>;
}

impl<T: ProgressSink + ?Sized> ProgressSink for &T {
    fn update(&self, state: &ProgressState) {
        (**self).update(state)
    }

    fn finish(&self) {
        (**self).finish()
    }
}
