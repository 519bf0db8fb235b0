//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use inboxai::{Backend, BackendReply, Command, SpeechEngine, Utterance, Voice};

/// Speech engine that records everything it is asked to do
///
/// The voice list is shared so a test can change it after the engine has
/// been handed to a popup.
#[derive(Default)]
pub struct RecordingEngine {
    pub voices: Arc<Mutex<Vec<Voice>>>,
    pub spoken: Vec<Utterance>,
    pub cancels: usize,
}

impl RecordingEngine {
    /// Engine whose voices are already loaded
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            voices: Arc::new(Mutex::new(voices)),
            ..Self::default()
        }
    }

    /// Texts of audible utterances, in order
    pub fn audible(&self) -> Vec<&str> {
        self.spoken
            .iter()
            .filter(|u| u.volume > 0.0)
            .map(|u| u.text.as_str())
            .collect()
    }
}

impl SpeechEngine for RecordingEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.lock().unwrap().clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> inboxai::Result<()> {
        self.spoken.push(utterance.clone());
        Ok(())
    }

    fn cancel(&mut self) {
        self.cancels += 1;
    }
}

/// Backend answering from a fixed script
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<inboxai::Result<BackendReply>>>,
    pub commands: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<inboxai::Result<BackendReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn send(&self, command: &Command) -> inboxai::Result<BackendReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().push(command.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(BackendReply::Unrecognized))
    }
}

/// Serve a router on an ephemeral local port
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server failed");
    });
    addr
}

/// An address nothing is listening on
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    listener.local_addr().expect("listener has no address")
}

/// A voice for tests
pub fn voice(name: &str, lang: &str) -> Voice {
    Voice {
        id: name.to_lowercase(),
        name: name.to_string(),
        lang: lang.to_string(),
    }
}

/// Shared request log for mock servers
pub type RequestLog = Arc<Mutex<Vec<serde_json::Value>>>;
