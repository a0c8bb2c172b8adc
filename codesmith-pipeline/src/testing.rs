//! Scripted provider for tests - replies come from a queue, no network

use codesmith_engine::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, Usage,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A provider that answers from a fixed script and records every request
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// Provider answering the given replies in order
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose first call fails with the given error
    pub fn erroring(err: ProviderError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(err)])),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, in call order
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn models(&self) -> Vec<String> {
        vec!["scripted".into()]
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.lock().unwrap().push(request.clone());

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(CompletionResponse {
                id: "scripted".into(),
                model: request.model.unwrap_or_else(|| "scripted".into()),
                content: Some(text),
                usage: Usage::default(),
            }),
            Some(Err(err)) => Err(err),
            None => Err(ProviderError::Other("scripted replies exhausted".into())),
        }
    }
}
