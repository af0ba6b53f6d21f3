//! Scripted in-memory [`HttpClient`] for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tokio::sync::Semaphore;

use super::client::HttpClient;

pub(crate) enum Reply {
    Respond {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: String,
    },
    TransportError,
    Hang,
}

impl Reply {
    pub(crate) fn json(body: &str) -> Self {
        Reply::Respond {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub(crate) fn json_with_validators(body: &str, etag: Option<&str>, last_modified: Option<&str>) -> Self {
        let mut headers = Vec::new();
        if let Some(etag) = etag {
            headers.push(("etag", etag.to_string()));
        }
        if let Some(last_modified) = last_modified {
            headers.push(("last-modified", last_modified.to_string()));
        }
        Reply::Respond {
            status: 200,
            headers,
            body: body.to_string(),
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Reply::Respond {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

/// Answers requests from a queue of replies, recording request headers.
///
/// With a gate installed, every request waits for one permit before it is
/// answered, which lets a test hold a cycle in flight.
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HeaderMap>>,
    gate: Option<Semaphore>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn gated(replies: Vec<Reply>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(replies)
        }
    }

    pub(crate) fn release(&self, requests: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(requests);
        }
    }

    pub(crate) fn requests(&self) -> Vec<HeaderMap> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.requests.lock().unwrap().push(req.headers().clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let reply = self.replies.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply.unwrap_or_else(|| Reply::status(500)) {
            Reply::Respond {
                status,
                headers,
                body,
            } => {
                let mut builder = http::Response::builder().status(status);
                for (name, value) in headers {
                    builder = builder.header(name, value);
                }
                Ok(reqwest::Response::from(builder.body(body).unwrap()))
            }
            Reply::TransportError => {
                // reqwest rejects non-http schemes before touching the network.
                let bad = reqwest::Request::new(reqwest::Method::GET, "ftp://example.test/".parse().unwrap());
                reqwest::Client::new().execute(bad).await
            }
            Reply::Hang => std::future::pending().await,
        }
    }
}
