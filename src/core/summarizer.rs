use crate::core::executor::RequestExecutor;
use crate::core::markdown;
use crate::core::prompts::{book_prompt, chapter_prompt, truncate_chars};
use crate::domain::model::{
    AttemptEvent, BookSummary, ChapterRef, ChapterSummary, ChapterSummaryResult, ChatRequest,
    ModelProfile, ProgressState,
};
use crate::domain::ports::{BookSource, ProgressSink, Transport};
use crate::utils::error::{DigestError, Result};
use std::time::Duration;

const CHAPTER_PHASE_END: u8 = 50;
const BOOK_PHASE_START: u8 = 75;

#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    pub chapter: ModelProfile,
    pub book: ModelProfile,
    /// Chapter text beyond this many characters is not sent.
    pub max_chapter_chars: usize,
    /// How long a failed run's error stays on the progress display.
    pub error_display_delay: Duration,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            chapter: ModelProfile::chapter_default(),
            book: ModelProfile::book_default(),
            max_chapter_chars: 100_000,
            error_display_delay: Duration::from_millis(3000),
        }
    }
}

/// Top-level table of contents entries; nested sub-chapters are read as part
/// of their parent section.
pub fn top_level_chapters(toc: &[ChapterRef]) -> Vec<&ChapterRef> {
    toc.iter().collect()
}

/// Joins per-chapter summaries into the input of the book prompt.
pub fn combine_chapter_summaries(results: &[ChapterSummaryResult]) -> String {
    results
        .iter()
        .map(|result| format!("**{}**\n{}", result.title, result.summary_markdown))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn require_credential(credential: Option<&str>) -> Result<&str> {
    credential
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(DigestError::NoCredential)
}

fn retry_status(subject: &str, event: &AttemptEvent) -> String {
    format!(
        "{} failed ({}). Retrying in {:.1}s (attempt {}/{})...",
        subject,
        event.reason,
        event.delay.as_secs_f32(),
        event.attempt + 1,
        event.max_attempts
    )
}

/// Single writer of the progress state shown by a sink.
struct ProgressReporter<'a, P: ProgressSink + ?Sized> {
    sink: &'a P,
    state: ProgressState,
}

impl<'a, P: ProgressSink + ?Sized> ProgressReporter<'a, P> {
    fn new(sink: &'a P) -> Self {
        Self {
            sink,
            state: ProgressState::default(),
        }
    }

    fn set(&mut self, percent_complete: u8, status_message: impl Into<String>) {
        self.state = ProgressState::new(percent_complete, status_message);
        self.sink.update(&self.state);
    }

    fn status(&mut self, status_message: impl Into<String>) {
        self.set(self.state.percent_complete, status_message);
    }

    fn finish(self) {
        self.sink.finish();
    }
}

/// Summarizes chapters one at a time and composes them into a book summary.
pub struct BookSummarizer<T: Transport> {
    executor: RequestExecutor<T>,
    settings: SummarizerSettings,
}

impl<T: Transport> BookSummarizer<T> {
    pub fn new(executor: RequestExecutor<T>, settings: SummarizerSettings) -> Self {
        Self { executor, settings }
    }

    pub fn executor(&self) -> &RequestExecutor<T> {
        &self.executor
    }

    pub fn settings(&self) -> &SummarizerSettings {
        &self.settings
    }

    /// Summarizes one chapter. Failures after the credential check are shown
    /// inline as the summary text instead of being returned.
    pub async fn summarize_chapter<B, P>(
        &self,
        book: &B,
        chapter: &ChapterRef,
        credential: Option<&str>,
        progress: &P,
    ) -> Result<ChapterSummary>
    where
        B: BookSource,
        P: ProgressSink + ?Sized,
    {
        let credential = require_credential(credential)?;
        let mut reporter = ProgressReporter::new(progress);
        reporter.set(0, format!("Summarizing \"{}\"...", chapter.label));

        let outcome = self
            .chapter_markdown(book, chapter, credential, |event| {
                reporter.status(retry_status(&chapter.label, event))
            })
            .await;

        let (summary_markdown, failed) = match outcome {
            Ok(Some(markdown)) => (markdown, false),
            Ok(None) => ("*This chapter has no text to summarize.*".to_string(), false),
            Err(err) => {
                tracing::warn!("Summary of '{}' failed: {}", chapter.label, err);
                (format!("**Error:** {}", err), true)
            }
        };

        reporter.set(100, "Done");
        reporter.finish();

        Ok(ChapterSummary {
            title: chapter.label.clone(),
            summary_html: markdown::render(&summary_markdown),
            summary_markdown,
            failed,
        })
    }

    /// Summarizes every top-level chapter, then the book as a whole.
    ///
    /// Chapter failures are recorded as placeholder entries; a failure of the
    /// final book call aborts the run.
    pub async fn summarize_book<B, P>(
        &self,
        book: &B,
        credential: Option<&str>,
        progress: &P,
    ) -> Result<BookSummary>
    where
        B: BookSource,
        P: ProgressSink + ?Sized,
    {
        let credential = require_credential(credential)?;
        let chapters = top_level_chapters(book.table_of_contents());
        if chapters.is_empty() {
            return Err(DigestError::NoChapters);
        }

        tracing::info!(
            "Summarizing '{}' ({} chapters)",
            book.title(),
            chapters.len()
        );

        let mut reporter = ProgressReporter::new(progress);
        let total = chapters.len();
        let mut results = Vec::with_capacity(total);

        for (index, chapter) in chapters.iter().enumerate() {
            let started = (index * CHAPTER_PHASE_END as usize / total) as u8;
            reporter.set(
                started,
                format!("Summarizing chapter {}/{}: {}", index + 1, total, chapter.label),
            );

            let outcome = self
                .chapter_markdown(book, chapter, credential, |event| {
                    reporter.status(retry_status(&chapter.label, event))
                })
                .await;

            match outcome {
                Ok(Some(summary_markdown)) => results.push(ChapterSummaryResult {
                    title: chapter.label.clone(),
                    summary_markdown,
                }),
                Ok(None) => {
                    tracing::info!("Skipping '{}': no text", chapter.label);
                }
                Err(err) => {
                    tracing::warn!("Chapter '{}' failed, continuing: {}", chapter.label, err);
                    results.push(ChapterSummaryResult {
                        title: chapter.label.clone(),
                        summary_markdown: format!("*Error summarizing this chapter: {}*", err),
                    });
                }
            }

            let completed = ((index + 1) * CHAPTER_PHASE_END as usize / total) as u8;
            reporter.set(completed, format!("Summarized {}/{} chapters", index + 1, total));
        }

        if results.is_empty() {
            reporter.finish();
            return Err(DigestError::NoChapters);
        }

        let combined = combine_chapter_summaries(&results);
        let prompt = book_prompt(self.settings.book.prompt.as_deref(), book.title(), &combined);
        let request = ChatRequest::from_prompt(&self.settings.book, prompt);

        reporter.set(BOOK_PHASE_START, "Creating book summary...");
        let outcome = self
            .executor
            .execute(
                credential,
                &request,
                "Book summary",
                self.settings.book.timeout(),
                |event| reporter.status(retry_status("Book summary", event)),
            )
            .await;

        match outcome {
            Ok(summary_markdown) => {
                reporter.set(100, "Book summary complete");
                reporter.finish();
                tracing::info!(
                    "Book summary ready ({} chapter summaries)",
                    results.len()
                );
                Ok(BookSummary {
                    book_title: book.title().to_string(),
                    summary_html: markdown::render(&summary_markdown),
                    summary_markdown,
                    chapters: results,
                    generated_at: chrono::Utc::now(),
                })
            }
            Err(err) => {
                tracing::error!("Book summary failed: {}", err);
                reporter.status(format!("Error: {}", err.user_friendly_message()));
                tokio::time::sleep(self.settings.error_display_delay).await;
                reporter.set(0, "");
                reporter.finish();
                Err(err)
            }
        }
    }

    /// `Ok(None)` when the chapter has no text.
    async fn chapter_markdown<B, F>(
        &self,
        book: &B,
        chapter: &ChapterRef,
        credential: &str,
        on_attempt: F,
    ) -> Result<Option<String>>
    where
        B: BookSource,
        F: FnMut(&AttemptEvent) + Send,
    {
        let text = book.load_chapter_text(&chapter.href).await?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let text = truncate_chars(text, self.settings.max_chapter_chars);
        let prompt = chapter_prompt(self.settings.chapter.prompt.as_deref(), &chapter.label, text);
        let request = ChatRequest::from_prompt(&self.settings.chapter, prompt);
        tracing::debug!(
            "Chapter '{}': sending {} chars of text",
            chapter.label,
            text.chars().count()
        );

        self.executor
            .execute(
                credential,
                &request,
                &format!("Chapter '{}'", chapter.label),
                self.settings.chapter.timeout(),
                on_attempt,
            )
            .await
            .map(Some)
    }
}
