//! arXiv discovery source.
//!
//! Queries `{base}/api/query` sorted by submission date (newest first) and
//! parses the Atom feed into [`PaperRecord`]s. `url` is the PDF link when the
//! entry has one, otherwise the entry id.

use async_trait::async_trait;
use papertrail_config::DiscoveryConfig;
use papertrail_core::PaperRecord;
use papertrail_core::discovery::DiscoverySource;
use papertrail_core::error::DiscoveryError;
use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::time::Duration;
use tracing::{debug, warn};

pub struct ArxivSource {
    base_url: String,
    client: reqwest::Client,
}

impl ArxivSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(&config.arxiv_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query_params(query: &str, max_results: usize) -> [(&'static str, String); 5] {
        [
            ("search_query", format!("all:{query}")),
            ("start", "0".into()),
            ("max_results", max_results.to_string()),
            ("sortBy", "submittedDate".into()),
            ("sortOrder", "descending".into()),
        ]
    }
}

#[async_trait]
impl DiscoverySource for ArxivSource {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>, DiscoveryError> {
        let url = format!("{}/api/query", self.base_url);
        debug!(query, max_results, "Querying arXiv");

        let response = self
            .client
            .get(&url)
            .query(&Self::query_params(query, max_results))
            .send()
            .await
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 || status == 503 {
            return Err(DiscoveryError::RateLimited);
        }
        if status != 200 {
            warn!(status, "arXiv returned error");
            return Err(DiscoveryError::Upstream { status_code: status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;

        let papers = parse_feed(&body, query)?;
        debug!(count = papers.len(), "arXiv results parsed");
        Ok(papers)
    }
}

/// Parse an arXiv Atom feed. Every record gets `topic` set to `topic`.
/// Entries without an id or title are skipped.
pub fn parse_feed(xml: &str, topic: &str) -> Result<Vec<PaperRecord>, DiscoveryError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = FeedParser::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => parser.handle_start(e),
            Ok(Event::Empty(ref e)) => parser.handle_empty(e),
            Ok(Event::Text(ref e)) => parser.handle_text(e),
            Ok(Event::End(ref e)) => parser.handle_end(e),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DiscoveryError::Parse(format!(
                    "invalid Atom XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    Ok(parser
        .entries
        .into_iter()
        .filter_map(|entry| entry.into_record(topic))
        .collect())
}

#[derive(Default)]
struct EntryFields {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    pdf_url: Option<String>,
}

impl EntryFields {
    fn push_text(&mut self, tag: &str, text: &str, in_author: bool) {
        match tag {
            "id" => self.id.push_str(text),
            "title" => self.title.push_str(text),
            "summary" => self.summary.push_str(text),
            "published" => self.published.push_str(text),
            "name" if in_author => self.authors.push(normalize_whitespace(text)),
            _ => {}
        }
    }

    fn into_record(self, topic: &str) -> Option<PaperRecord> {
        let id = self.id.trim().to_string();
        let title = normalize_whitespace(&self.title);
        if id.is_empty() || title.is_empty() {
            return None;
        }

        // arXiv dates are UTC ("2024-03-01T12:00:00Z"); keep the naive form.
        let published = self.published.trim();
        let published = published.strip_suffix('Z').unwrap_or(published);

        Some(
            PaperRecord::new(title, self.authors, normalize_whitespace(&self.summary), published)
                .with_url(self.pdf_url.unwrap_or(id))
                .with_topic(topic),
        )
    }
}

/// Atom state machine: tracks the open entry, the current leaf tag and
/// whether we're inside `<author>`.
#[derive(Default)]
struct FeedParser {
    entries: Vec<EntryFields>,
    current: EntryFields,
    current_tag: String,
    in_entry: bool,
    in_author: bool,
}

impl FeedParser {
    fn handle_start(&mut self, e: &BytesStart<'_>) {
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
        match tag.as_str() {
            "entry" => {
                self.in_entry = true;
                self.current = EntryFields::default();
            }
            "author" if self.in_entry => self.in_author = true,
            "link" if self.in_entry => self.take_pdf_link(e),
            _ if self.in_entry => self.current_tag = tag,
            _ => {}
        }
    }

    fn handle_empty(&mut self, e: &BytesStart<'_>) {
        if self.in_entry && e.name().as_ref() == b"link" {
            self.take_pdf_link(e);
        }
    }

    fn handle_text(&mut self, e: &BytesText<'_>) {
        if !self.in_entry || self.current_tag.is_empty() {
            return;
        }
        let text = e.unescape().map(|t| t.into_owned()).unwrap_or_default();
        self.current.push_text(&self.current_tag, &text, self.in_author);
    }

    fn handle_end(&mut self, e: &BytesEnd<'_>) {
        match e.name().as_ref() {
            b"entry" => {
                let finished = std::mem::take(&mut self.current);
                self.entries.push(finished);
                self.in_entry = false;
                self.current_tag.clear();
            }
            b"author" => self.in_author = false,
            _ => self.current_tag.clear(),
        }
    }

    fn take_pdf_link(&mut self, e: &BytesStart<'_>) {
        let mut href = None;
        let mut is_pdf = false;
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"title" => is_pdf = attr.value.as_ref() == b"pdf",
                b"href" => href = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                _ => {}
            }
        }
        if is_pdf {
            if let Some(href) = href.filter(|h| !h.is_empty()) {
                self.current.pdf_url = Some(href);
            }
        }
    }
}

/// Collapse runs of whitespace (arXiv wraps titles and abstracts) to one space.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
