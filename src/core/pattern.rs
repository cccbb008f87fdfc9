//! Key batching.
//!
//! A single key becomes one matcher as-is. Several keys are sorted longest
//! first (stable on ties) and split into batches of at most `batch_size`, each
//! compiled into one alternation. Regex alternation is leftmost-first, so the
//! longer key wins wherever two keys could start at the same position.
//!
//! In [`KeyMode::Pattern`] keys are regular expressions and are NOT escaped.
//! [`KeyMode::Literal`] escapes every key before compiling.

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound on keys compiled into one matcher.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// How keys are interpreted by the matcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// Keys are regular expressions (metacharacters are live)
    #[default]
    Pattern,
    /// Keys are matched as plain substrings
    Literal,
}

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("at least one key is required")]
    NoKeys,

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("batch {batch} does not compile")]
    Invalid {
        batch: usize,
        #[source]
        source: regex::Error,
    },
}

/// Ordered group of keys compiled into one matcher.
#[derive(Debug, Clone)]
pub struct KeyBatch {
    index: usize,
    keys: Vec<String>,
    matcher: Regex,
}

impl KeyBatch {
    /// Position of this batch in application order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }
}

/// Stable sort by descending character count.
pub fn sort_longest_first(keys: &[String]) -> Vec<String> {
    let mut sorted = keys.to_vec();
    sorted.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));
    sorted
}

/// Turn raw keys into the ordered matcher batches applied by the engine.
pub fn build_batches(
    keys: &[String],
    mode: KeyMode,
    batch_size: usize,
) -> Result<Vec<KeyBatch>, PatternError> {
    if keys.is_empty() {
        return Err(PatternError::NoKeys);
    }
    if batch_size == 0 {
        return Err(PatternError::ZeroBatchSize);
    }

    let render = |k: &str| match mode {
        KeyMode::Pattern => k.to_string(),
        KeyMode::Literal => regex::escape(k),
    };

    // One key: used unmodified, no grouping
    if let [key] = keys {
        let matcher =
            Regex::new(&render(key)).map_err(|source| PatternError::Invalid { batch: 0, source })?;
        return Ok(vec![KeyBatch {
            index: 0,
            keys: vec![key.clone()],
            matcher,
        }]);
    }

    let sorted = sort_longest_first(keys);
    let batches = sorted
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| {
            let alternation = chunk
                .iter()
                .map(|k| render(k))
                .collect::<Vec<_>>()
                .join("|");
            let matcher = Regex::new(&format!("(?:{alternation})"))
                .map_err(|source| PatternError::Invalid { batch: index, source })?;

            Ok(KeyBatch {
                index,
                keys: chunk.to_vec(),
                matcher,
            })
        })
        .collect::<Result<Vec<_>, PatternError>>()?;

    debug!(keys = keys.len(), batches = batches.len(), ?mode, "built key batches");
    Ok(batches)
}
