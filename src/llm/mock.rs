use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatCompletionRequest, ChatCompletionResponse, LlmClient, OpenAiError};

/// Replays queued responses in order and records every request.
#[derive(Debug, Default)]
pub struct MockClient {
    responses: Mutex<VecDeque<Result<ChatCompletionResponse, OpenAiError>>>,
    calls: Mutex<Vec<ChatCompletionRequest>>,
}

impl MockClient {
    pub fn new() -> Self { Self::default() }

    pub fn push_response(&self, resp: Result<ChatCompletionResponse, OpenAiError>) {
        self.responses.lock().unwrap().push_back(resp);
    }

    pub fn push_text(&self, content: &str) {
        self.push_response(Ok(ChatCompletionResponse::text(content)));
    }

    pub fn calls(&self) -> Vec<ChatCompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, OpenAiError> {
        self.calls.lock().unwrap().push(request);
        self.responses.lock().unwrap().pop_front().unwrap_or(Err(OpenAiError::MockQueueEmpty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_enqueued_response() {
        let mock = MockClient::new();
        mock.push_text("hi");
        let req = ChatCompletionRequest::instructed("sys", "Hello");
        let out = mock.chat_completion(req.clone()).await.unwrap();
        assert_eq!(out.content, "hi");
        assert_eq!(mock.calls(), vec![req]);
    }

    #[tokio::test]
    async fn empty_queue_errors() {
        let mock = MockClient::new();
        let err = mock.chat_completion(ChatCompletionRequest::instructed("s", "u")).await.unwrap_err();
        assert!(matches!(err, OpenAiError::MockQueueEmpty));
    }
}
