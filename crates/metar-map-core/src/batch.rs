//! Splits identifier lists into request URLs that fit a length budget.

use serde::{Deserialize, Serialize};

/// Request URLs longer than this are split into several batches.
pub const DEFAULT_MAX_URL_LEN: usize = 1024;

/// A lookup URL with the identifier list spliced between `prefix` and `suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
}

impl RequestTemplate {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn url_for(&self, identifiers: &[String]) -> String {
        format!("{}{}{}", self.prefix, identifiers.join(","), self.suffix)
    }

    fn fixed_len(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub identifiers: Vec<String>,
    pub url: String,
}

/// Greedily packs `identifiers` into batches whose URL length stays within
/// `max_url_len` bytes.
///
/// A batch always takes at least its first identifier, so every batch makes
/// progress even when a single identifier is too long on its own. Such a
/// batch is the only kind whose URL can exceed the limit.
pub fn plan_batches(
    template: &RequestTemplate,
    identifiers: &[String],
    max_url_len: usize,
) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = template.fixed_len();

    for id in identifiers {
        if current.is_empty() {
            current_len = template.fixed_len() + id.len();
            current.push(id.clone());
            continue;
        }

        // +1 for the comma separator
        let projected = current_len + 1 + id.len();
        if projected > max_url_len {
            batches.push(close(template, std::mem::take(&mut current)));
            current_len = template.fixed_len() + id.len();
        } else {
            current_len = projected;
        }
        current.push(id.clone());
    }

    if !current.is_empty() {
        batches.push(close(template, current));
    }
    batches
}

fn close(template: &RequestTemplate, identifiers: Vec<String>) -> Batch {
    let url = template.url_for(&identifiers);
    Batch { identifiers, url }
}
