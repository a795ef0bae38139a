//! Fake collaborators shared by the integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use vox_agentic::ResultClassifier;
use vox_intents::{ExecutorOutput, IntentExecutor};

pub const WAIT: Duration = Duration::from_secs(5);

/// Executor with a fixed answer that records every payload it receives
pub struct FakeExecutor {
    reply: Result<String, String>,
    payloads: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn replying(output: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(output.to_string()),
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntentExecutor for FakeExecutor {
    async fn invoke(&self, serialized_intent: &str) -> Result<ExecutorOutput> {
        self.payloads
            .lock()
            .unwrap()
            .push(serialized_intent.to_string());
        match &self.reply {
            Ok(output) => Ok(ExecutorOutput::new(output.clone())),
            Err(message) => Err(anyhow!("{}", message)),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Classifier with a fixed reply that counts calls
pub struct ScriptedClassifier {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultClassifier for ScriptedClassifier {
    async fn classify(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Classifier that never answers; records when its call is dropped
pub struct HangingClassifier {
    pub started: Arc<Notify>,
    pub cancelled: Arc<AtomicBool>,
}

impl HangingClassifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started: Arc::new(Notify::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[async_trait]
impl ResultClassifier for HangingClassifier {
    async fn classify(&self, _prompt: &str) -> Result<String> {
        let _guard = SetOnDrop(self.cancelled.clone());
        self.started.notify_one();
        std::future::pending::<Result<String>>().await
    }
}

/// Classifier that holds back its answer for prompts mentioning `held` until
/// `release` is notified. Held prompts read as a failure, all others as a
/// success with a transaction link.
pub struct GatedClassifier {
    held: String,
    pub held_started: Arc<Notify>,
    pub release: Arc<Notify>,
    completed: AtomicUsize,
}

impl GatedClassifier {
    pub fn holding(held: &str) -> Arc<Self> {
        Arc::new(Self {
            held: held.to_string(),
            held_started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
            completed: AtomicUsize::new(0),
        })
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultClassifier for GatedClassifier {
    async fn classify(&self, prompt: &str) -> Result<String> {
        let reply = if prompt.contains(&self.held) {
            self.held_started.notify_one();
            self.release.notified().await;
            r#"{"status":"fail","txnUrl":null}"#
        } else {
            r#"{"status":"success","txnUrl":"https://basescan.org/tx/0x2"}"#
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(reply.to_string())
    }
}
