//! Passage input formats.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonPassage {
    Text(String),
    Record { text: String },
}

/// Split plain text into passages at blank lines.
///
/// Lines within a paragraph are joined with a single space.
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                passages.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        passages.push(current.join(" "));
    }

    passages
}

/// Parse JSON Lines where each line is a string or an object with `text`.
///
/// Blank lines are skipped; line numbers in errors are 1-based.
pub fn json_lines(text: &str) -> Result<Vec<String>, InputError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<JsonPassage>(line)
                .map(|p| match p {
                    JsonPassage::Text(text) | JsonPassage::Record { text } => text,
                })
                .map_err(|source| InputError::Json {
                    line: idx + 1,
                    source,
                })
        })
        .collect()
}

pub fn read_passages(text: &str, jsonl: bool) -> Result<Vec<String>, InputError> {
    if jsonl {
        json_lines(text)
    } else {
        Ok(paragraphs(text))
    }
}
