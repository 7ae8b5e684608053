use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::extract::DocumentSource;
use crate::llm::{ChatCompletionRequest, LlmClient};
use crate::telemetry::{self, ops::summarize::Phase};

use super::prompt;

pub const DEFAULT_MAX_CHUNK_CHARS: usize = 100_000;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SummarizerConfig {
    pub max_chunk_chars: usize,
    pub max_tokens: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self { max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS, max_tokens: DEFAULT_MAX_TOKENS }
    }
}

impl SummarizerConfig {
    /// SUMMARY_MAX_CHUNK_CHARS / SUMMARY_MAX_TOKENS over the defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_chunk_chars: env_positive("SUMMARY_MAX_CHUNK_CHARS").unwrap_or(d.max_chunk_chars),
            max_tokens: env_positive("SUMMARY_MAX_TOKENS").unwrap_or(d.max_tokens),
        }
    }
}

fn env_positive<T: std::str::FromStr + PartialOrd + Default>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse::<T>().ok().filter(|v| *v > T::default())
}

/// Produces a summary for the document behind a URL, or `None`.
#[async_trait]
pub trait DocumentSummarizer: Send + Sync {
    async fn summarize_url(&self, url: &str) -> Option<String>;
}

/// Fixed-size character slices in order. Text within the limit is one chunk.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<&str> {
    let max = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut n = 0;
    for (i, _) in text.char_indices() {
        if n == max {
            chunks.push(&text[start..i]);
            start = i;
            n = 0;
        }
        n += 1;
    }
    chunks.push(&text[start..]);
    chunks
}

/// Map-reduce summarizer: one call for a short document, otherwise one call
/// per chunk followed by a single call over the joined chunk summaries.
pub struct ChunkedSummarizer {
    source: Arc<dyn DocumentSource>,
    llm: Arc<dyn LlmClient>,
    cfg: SummarizerConfig,
}

impl ChunkedSummarizer {
    pub fn new(source: Arc<dyn DocumentSource>, llm: Arc<dyn LlmClient>, cfg: SummarizerConfig) -> Self {
        Self { source, llm, cfg }
    }

    pub async fn summarize_text(&self, text: &str) -> Option<String> {
        let log = telemetry::summarize();
        let chunks = {
            let _s = log.span(&Phase::Split).entered();
            split_chunks(text, self.cfg.max_chunk_chars)
        };

        if let [only] = chunks.as_slice() {
            return self.call(prompt::DOCUMENT, only).await;
        }

        let map_span = log.span_kv(&Phase::MapChunks, [("chunks", chunks.len().to_string())]);
        let partials = async {
            let mut partials = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                match self.call(prompt::DOCUMENT, chunk).await {
                    Some(s) => partials.push(s),
                    None => log.warn_kv("chunk summary failed", [("chunk", (i + 1).to_string()), ("of", chunks.len().to_string())]),
                }
            }
            partials
        }
        .instrument(map_span)
        .await;
        if partials.is_empty() {
            log.warn_kv("no chunk summaries survived", [("chunks", chunks.len().to_string())]);
            return None;
        }

        let reduce_span = log.span_kv(&Phase::Reduce, [("partials", partials.len().to_string())]);
        self.call(prompt::REDUCE, &partials.join("\n\n")).instrument(reduce_span).await
    }

    async fn call(&self, instruction: &str, body: &str) -> Option<String> {
        let req = ChatCompletionRequest::instructed(instruction, body).with_max_tokens(self.cfg.max_tokens);
        match self.llm.chat_completion(req).await {
            Ok(resp) => {
                let text = resp.content.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                telemetry::summarize().warn_kv("summarization call failed", [("error", e.to_string()), ("retryable", e.is_retryable().to_string())]);
                None
            }
        }
    }
}

#[async_trait]
impl DocumentSummarizer for ChunkedSummarizer {
    async fn summarize_url(&self, url: &str) -> Option<String> {
        let log = telemetry::summarize();
        let fetch_span = log.span_kv(&Phase::FetchDocument, [("url", url.to_string())]);
        let text = self.source.fetch_text(url).instrument(fetch_span).await;
        match text {
            Some(t) if !t.trim().is_empty() => self.summarize_text(&t).await,
            _ => {
                log.warn_kv("no text extracted", [("url", url.to_string())]);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::llm::mock::MockClient;
    use crate::llm::OpenAiError;

    /// Serves fixed text per URL; unknown URLs have no text.
    #[derive(Default)]
    pub(crate) struct StubSource(pub HashMap<String, String>);

    #[async_trait]
    impl DocumentSource for StubSource {
        async fn fetch_text(&self, url: &str) -> Option<String> {
            self.0.get(url).cloned()
        }
    }

    fn summarizer(source: StubSource, llm: Arc<MockClient>, max_chunk_chars: usize) -> ChunkedSummarizer {
        ChunkedSummarizer::new(Arc::new(source), llm, SummarizerConfig { max_chunk_chars, max_tokens: 4096 })
    }

    #[test]
    fn splits_on_character_count() {
        let text = "a".repeat(25_000);
        let chunks = split_chunks(&text, 10_000);
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![10_000, 10_000, 5_000]);
        assert_eq!(split_chunks("short", 10).len(), 1);
        assert_eq!(split_chunks("exactly10!", 10), vec!["exactly10!"]);
    }

    #[test]
    fn split_respects_multibyte_boundaries() {
        let text = "₹₹₹₹₹";
        assert_eq!(split_chunks(text, 2), vec!["₹₹", "₹₹", "₹"]);
        assert_eq!(split_chunks(text, 2).concat(), text);
    }

    #[tokio::test]
    async fn single_chunk_is_one_call() {
        let llm = Arc::new(MockClient::new());
        llm.push_text("- Dividend declared");
        let s = summarizer(StubSource::default(), llm.clone(), 10_000);
        let out = s.summarize_text("Board declared a dividend of Rs 5 per share").await;
        assert_eq!(out.as_deref(), Some("- Dividend declared"));
        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages[0].content, prompt::DOCUMENT);
        assert_eq!(calls[0].max_tokens, Some(4096));
    }

    #[tokio::test]
    async fn long_document_maps_then_reduces() {
        let llm = Arc::new(MockClient::new());
        for r in ["part one", "part two", "part three", "final"] { llm.push_text(r); }
        let text = "x".repeat(25_000);
        let s = summarizer(StubSource::default(), llm.clone(), 10_000);
        assert_eq!(s.summarize_text(&text).await.as_deref(), Some("final"));

        let calls = llm.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].messages[1].content.len(), 10_000);
        assert_eq!(calls[2].messages[1].content.len(), 5_000);
        assert_eq!(calls[3].messages[0].content, prompt::REDUCE);
        assert_eq!(calls[3].messages[1].content, "part one\n\npart two\n\npart three");
    }

    #[tokio::test]
    async fn failed_chunks_are_dropped_before_reduce() {
        let llm = Arc::new(MockClient::new());
        llm.push_text("kept");
        llm.push_response(Err(OpenAiError::Timeout));
        llm.push_text("   ");
        llm.push_text("reduced");
        let s = summarizer(StubSource::default(), llm.clone(), 4);
        assert_eq!(s.summarize_text("aaaabbbbcc").await.as_deref(), Some("reduced"));
        let calls = llm.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[3].messages[1].content, "kept");
    }

    #[tokio::test]
    async fn all_chunks_failing_skips_reduce() {
        let llm = Arc::new(MockClient::new());
        llm.push_response(Err(OpenAiError::Timeout));
        llm.push_response(Err(OpenAiError::EmptyResponse));
        let s = summarizer(StubSource::default(), llm.clone(), 5);
        assert_eq!(s.summarize_text("0123456789").await, None);
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn url_without_text_makes_no_calls() {
        let llm = Arc::new(MockClient::new());
        let mut docs = HashMap::new();
        docs.insert("https://x/blank.pdf".to_string(), "  \n ".to_string());
        let s = summarizer(StubSource(docs), llm.clone(), 100);
        assert_eq!(s.summarize_url("https://x/missing.pdf").await, None);
        assert_eq!(s.summarize_url("https://x/blank.pdf").await, None);
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn url_with_text_is_summarized() {
        let llm = Arc::new(MockClient::new());
        llm.push_text("summary");
        let mut docs = HashMap::new();
        docs.insert("https://x/a.xml".to_string(), "Outcome of board meeting".to_string());
        let s = summarizer(StubSource(docs), llm.clone(), 100);
        assert_eq!(s.summarize_url("https://x/a.xml").await.as_deref(), Some("summary"));
        assert_eq!(llm.calls()[0].messages[1].content, "Outcome of board meeting");
    }
}
