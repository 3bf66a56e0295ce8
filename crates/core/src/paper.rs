//! Paper records: the unit of data flowing through Papertrail.
//!
//! A [`PaperRecord`] is created by a discovery source or loaded from a store.
//! The synthesis pipeline only ever reads records; any truncation happens on
//! owned copies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One discovered or stored paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title. Used as the natural key within a session.
    pub title: String,

    /// Authors in publication order.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Full abstract; may be arbitrarily long.
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,

    /// ISO-8601 date or date-time (e.g. "2024-03-01T12:00:00").
    #[serde(default)]
    pub published_date: String,

    /// Link to the paper (PDF when available).
    #[serde(default)]
    pub url: String,

    /// The query that produced this record.
    #[serde(default)]
    pub topic: String,
}

impl PaperRecord {
    /// Create a record with the required fields; `url` and `topic` start empty.
    pub fn new(
        title: impl Into<String>,
        authors: Vec<String>,
        abstract_text: impl Into<String>,
        published_date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            authors,
            abstract_text: abstract_text.into(),
            published_date: published_date.into(),
            url: String::new(),
            topic: String::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// The 4-character year prefix of `published_date` (shorter if the date is).
    pub fn year(&self) -> &str {
        match self.published_date.char_indices().nth(4) {
            Some((idx, _)) => &self.published_date[..idx],
            None => &self.published_date,
        }
    }

    /// The publication year as a number, when the prefix parses.
    pub fn published_year(&self) -> Option<i32> {
        self.year().parse().ok()
    }

    /// Authors joined with ", " as used in prompts and reference lines.
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

/// A reference line derived from a record that the generated text mentions.
///
/// Never persisted; rendered as `[title] - author1, author2 (year)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationReference {
    pub title: String,
    pub authors: Vec<String>,
    pub year: String,
}

impl From<&PaperRecord> for CitationReference {
    fn from(record: &PaperRecord) -> Self {
        Self {
            title: record.title.clone(),
            authors: record.authors.clone(),
            year: record.year().to_string(),
        }
    }
}

impl fmt::Display for CitationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] - {} ({})",
            self.title,
            self.authors.join(", "),
            self.year
        )
    }
}

/// Partial update applied to a stored record. `None` fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl MetadataUpdate {
    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.authors.is_none()
            && self.abstract_text.is_none()
            && self.published_date.is_none()
            && self.url.is_none()
            && self.topic.is_none()
    }

    /// Apply the set fields to `record`.
    pub fn apply(&self, record: &mut PaperRecord) {
        if let Some(authors) = &self.authors {
            record.authors = authors.clone();
        }
        if let Some(abstract_text) = &self.abstract_text {
            record.abstract_text = abstract_text.clone();
        }
        if let Some(date) = &self.published_date {
            record.published_date = date.clone();
        }
        if let Some(url) = &self.url {
            record.url = url.clone();
        }
        if let Some(topic) = &self.topic {
            record.topic = topic.clone();
        }
    }
}
