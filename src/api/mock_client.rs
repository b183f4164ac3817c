use crate::api::client::{ByteStream, TurnTransport};
use crate::types::{ResumeRequest, TurnRequest};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One canned response: byte chunks delivered in order, optionally ending
/// with a transport failure instead of a clean close.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponse {
    pub chunks: Vec<String>,
    pub fail_with: Option<String>,
}

impl ScriptedResponse {
    /// Each line becomes one newline-terminated chunk.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: lines
                .into_iter()
                .map(|line| {
                    let line = line.into();
                    if line.ends_with('\n') {
                        line
                    } else {
                        format!("{line}\n")
                    }
                })
                .collect(),
            fail_with: None,
        }
    }

    /// Chunks delivered exactly as given.
    pub fn raw_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            fail_with: None,
        }
    }

    pub fn failing_after(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum RecordedRequest {
    Turn(TurnRequest),
    Resume(ResumeRequest),
}

/// Replays scripted responses in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn next_stream(&self, request: RecordedRequest) -> Result<ByteStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let response = self
            .responses
            .lock()
            .map_err(|_| anyhow::anyhow!("ScriptedTransport: response queue poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("ScriptedTransport: no more responses configured"))?;

        let mut items: Vec<Result<Bytes>> = response
            .chunks
            .into_iter()
            .map(|chunk| Ok(Bytes::from(chunk)))
            .collect();
        if let Some(message) = response.fail_with {
            items.push(Err(anyhow::anyhow!(message)));
        }

        Ok(Box::pin(stream::iter(items)))
    }
}

#[async_trait]
impl TurnTransport for ScriptedTransport {
    async fn open_turn(&self, request: &TurnRequest) -> Result<ByteStream> {
        self.next_stream(RecordedRequest::Turn(request.clone()))
    }

    async fn open_resume(&self, request: &ResumeRequest) -> Result<ByteStream> {
        self.next_stream(RecordedRequest::Resume(request.clone()))
    }
}
