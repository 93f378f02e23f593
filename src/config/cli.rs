use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "epub-digest")]
#[command(about = "Read EPUB books and summarize them chapter by chapter")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    /// Do not print progress updates
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the table of contents with chapter numbers
    Toc { book: PathBuf },

    /// Summarize one top-level chapter
    Chapter {
        book: PathBuf,

        /// Chapter number as listed by `toc` (1-based)
        #[arg(short, long)]
        number: usize,

        /// Print the rendered HTML instead of Markdown
        #[arg(long)]
        html: bool,

        /// Print the chapter text without summarizing it
        #[arg(long, conflicts_with = "html")]
        text_only: bool,
    },

    /// Summarize every chapter and then the whole book
    Book {
        book: PathBuf,

        /// Directory for the summary files (overrides output.path)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Write the full text of the book in reading order
    ExportText {
        book: PathBuf,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Command {
    pub fn book_path(&self) -> &PathBuf {
        match self {
            Command::Toc { book }
            | Command::Chapter { book, .. }
            | Command::Book { book, .. }
            | Command::ExportText { book, .. } => book,
        }
    }
}
