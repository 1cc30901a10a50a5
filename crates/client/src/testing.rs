//! Scripted network for strategy, lifecycle and dispatcher tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use tokio::sync::watch;
use waypost_core::Error;

use crate::fetch::{NetworkClient, ProxyRequest, ProxyResponse, ResponseSource};

pub const ORIGIN: &str = "https://shop.test/";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

#[derive(Clone)]
enum Reply {
    Respond { status: u16, body: String, cache_control: Option<&'static str> },
    Fail,
}

/// Answers by URL path. Unscripted paths fail like an unreachable network.
pub struct ScriptedNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    total: AtomicUsize,
    open: watch::Sender<bool>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            total: AtomicUsize::new(0),
            open: watch::Sender::new(true),
        }
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.script(path, Reply::Respond { status, body: body.to_string(), cache_control: None });
    }

    pub fn respond_with_cache_control(&self, path: &str, status: u16, body: &str, cache_control: &'static str) {
        self.script(path, Reply::Respond { status, body: body.to_string(), cache_control: Some(cache_control) });
    }

    fn script(&self, path: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(path.to_string(), reply);
    }

    pub fn fail(&self, path: &str) {
        self.script(path, Reply::Fail);
    }

    /// Make every fetch wait until [`ScriptedNetwork::release`].
    pub fn hold(&self) {
        self.open.send_replace(false);
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }

    pub fn calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| p.as_str() == path).count()
    }
}

#[async_trait::async_trait]
impl NetworkClient for ScriptedNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        let path = request.url.path().to_string();
        self.total.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(path.clone());

        let mut open = self.open.subscribe();
        let _ = open.wait_for(|open| *open).await;

        let reply = self.replies.lock().unwrap().get(&path).cloned().unwrap_or(Reply::Fail);
        match reply {
            Reply::Respond { status, body, cache_control } => {
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                if let Some(value) = cache_control {
                    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
                }
                Ok(ProxyResponse::new(
                    StatusCode::from_u16(status).unwrap(),
                    headers,
                    body,
                    ResponseSource::Network,
                ))
            }
            Reply::Fail => Err(Error::NetworkUnavailable(format!("offline: {path}"))),
        }
    }
}
