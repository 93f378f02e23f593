use anyhow::Context;
use clap::Parser;
use epub_digest::adapters::credential::{
    first_available, EnvCredential, PromptCredential, StaticCredential,
};
use epub_digest::adapters::progress::{spawn_console_display, NoProgress, WatchProgress};
use epub_digest::config::cli::{Command, LogFormat};
use epub_digest::core::export::{export_book_text, save_book_summary};
use epub_digest::core::summarizer::top_level_chapters;
use epub_digest::domain::ports::{BookSource, ProgressSink};
use epub_digest::utils::{logger, validation::Validate};
use epub_digest::{
    BookSummarizer, CliConfig, DigestError, EpubBook, LocalStorage, RequestExecutor,
    ReqwestTransport, SummarizerConfig,
};
use std::path::Path;
use tokio::task::JoinHandle;

const DEFAULT_CONFIG_FILE: &str = "epub-digest.toml";

fn load_config(cli: &CliConfig) -> epub_digest::Result<SummarizerConfig> {
    match &cli.config {
        Some(path) => SummarizerConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            SummarizerConfig::from_file(DEFAULT_CONFIG_FILE)
        }
        None => Ok(SummarizerConfig::default()),
    }
}

fn report_failure(e: &DigestError) -> ! {
    tracing::error!("❌ {}", e);
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(1);
}

fn print_toc(book: &EpubBook) {
    println!("{}", book.title());
    if let Some(author) = book.author() {
        println!("by {}", author);
    }
    for (index, chapter) in top_level_chapters(book.table_of_contents())
        .into_iter()
        .enumerate()
    {
        println!("{:>3}. {}", index + 1, chapter.label);
        for child in &chapter.children {
            println!("       {}", child.label);
        }
    }
}

/// Progress sink for a run, with the task printing it when not quiet.
fn progress_display(quiet: bool) -> (Box<dyn ProgressSink>, Option<JoinHandle<()>>) {
    if quiet {
        return (Box::new(NoProgress), None);
    }
    let (progress, receiver) = WatchProgress::channel();
    (Box::new(progress), Some(spawn_console_display(receiver)))
}

/// Waits for the display task; it ends once the sink has been dropped.
async fn finish_display(display: Option<JoinHandle<()>>) {
    if let Some(handle) = display {
        if let Err(e) = handle.await {
            tracing::debug!("Progress display stopped: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }
    tracing::debug!("CLI config: {:?}", cli);

    let config = load_config(&cli).unwrap_or_else(|e| report_failure(&e));
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed");
        report_failure(&e);
    }

    let book_path = cli.command.book_path();
    let book = EpubBook::open(book_path).unwrap_or_else(|e| report_failure(&e));

    match &cli.command {
        Command::Toc { .. } => print_toc(&book),

        Command::ExportText { output, .. } => {
            let text = export_book_text(&book).await;
            match output {
                Some(path) => {
                    tokio::fs::write(path, text)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("📁 Book text saved to: {}", path.display());
                }
                None => print!("{}", text),
            }
        }

        Command::Chapter {
            number,
            html,
            text_only,
            ..
        } => {
            let chapters = top_level_chapters(book.table_of_contents());
            let chapter = number
                .checked_sub(1)
                .and_then(|index| chapters.get(index).copied())
                .unwrap_or_else(|| {
                    report_failure(&DigestError::ChapterNotFound {
                        selector: number.to_string(),
                    })
                });

            if *text_only {
                let text = book
                    .load_chapter_text(&chapter.href)
                    .await
                    .unwrap_or_else(|e| report_failure(&e));
                println!("{}", text.trim());
                return Ok(());
            }

            let Some(credential) = acquire_credential(&config) else {
                return Ok(());
            };
            let summarizer = build_summarizer(&config);
            let (progress, display) = progress_display(cli.quiet);
            let outcome = summarizer
                .summarize_chapter(&book, chapter, Some(&credential), progress.as_ref())
                .await;
            drop(progress);
            finish_display(display).await;
            let summary = outcome.unwrap_or_else(|e| report_failure(&e));

            println!("# {}\n", summary.title);
            if *html {
                println!("{}", summary.summary_html);
            } else {
                println!("{}", summary.summary_markdown);
            }
            if summary.failed {
                std::process::exit(2);
            }
        }

        Command::Book { output, .. } => {
            let Some(credential) = acquire_credential(&config) else {
                return Ok(());
            };
            let summarizer = build_summarizer(&config);
            let (progress, display) = progress_display(cli.quiet);
            let outcome = summarizer
                .summarize_book(&book, Some(&credential), progress.as_ref())
                .await;
            drop(progress);
            finish_display(display).await;
            let summary = outcome.unwrap_or_else(|e| report_failure(&e));

            let output_path = output.as_deref().unwrap_or(config.output_path());
            let storage = LocalStorage::new(output_path);
            let stem = book_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "book".to_string());

            let written = save_book_summary(&storage, &stem, &summary)
                .await
                .unwrap_or_else(|e| report_failure(&e));

            println!("✅ Summarized {} chapters", summary.chapters.len());
            for name in written {
                println!("📁 {}", storage.full_path(&name));
            }
        }
    }

    Ok(())
}

/// Configured key, then the environment, then an interactive prompt.
/// A missing key ends the run silently.
fn acquire_credential(config: &SummarizerConfig) -> Option<String> {
    let configured = StaticCredential(config.api_key());
    let env = EnvCredential::new(config.api_key_env());
    let credential = first_available(&[&configured, &env, &PromptCredential]);
    if credential.is_none() {
        tracing::info!("No API key provided; nothing to do");
    }
    credential
}

fn build_summarizer(config: &SummarizerConfig) -> BookSummarizer<ReqwestTransport> {
    let transport = ReqwestTransport::new(config.endpoint());
    let executor = RequestExecutor::new(transport, config.retry_policy());
    BookSummarizer::new(executor, config.summarizer_settings())
}
