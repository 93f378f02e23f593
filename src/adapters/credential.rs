use crate::domain::ports::CredentialSource;
use std::io::{BufRead, Write};

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A key taken from the configuration file.
#[derive(Debug, Clone)]
pub struct StaticCredential(pub Option<String>);

impl CredentialSource for StaticCredential {
    fn acquire(&self) -> Option<String> {
        self.0.clone().and_then(non_empty)
    }
}

#[derive(Debug, Clone)]
pub struct EnvCredential {
    pub var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredential {
    fn acquire(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(non_empty)
    }
}

/// Asks for the key on the terminal. An empty line declines.
#[derive(Debug, Clone, Default)]
pub struct PromptCredential;

impl CredentialSource for PromptCredential {
    fn acquire(&self) -> Option<String> {
        eprint!("Enter your OpenAI API key (leave empty to cancel): ");
        std::io::stderr().flush().ok()?;
        read_credential(&mut std::io::stdin().lock())
    }
}

pub fn read_credential(reader: &mut impl BufRead) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => non_empty(line),
    }
}

/// First credential any source yields, in order.
pub fn first_available(sources: &[&dyn CredentialSource]) -> Option<String> {
    sources.iter().find_map(|source| source.acquire())
}
