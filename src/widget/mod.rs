//! Intent widgets
//!
//! Every dispatched intent gets one widget: an actor task that owns an
//! [`IntentStatusController`] and publishes [`WidgetSnapshot`]s over a watch
//! channel. The [`IntentWidget`] handle is what the conversation keeps.
//!
//! ```text
//! executor task ──InvocationFinished──┐
//! deliver()     ──Deliver─────────────┼──► actor ──JoinSet──► interpreter
//!                                     │      │
//!                                     │      └──watch──► snapshots
//! drop / dispose ──Dispose────────────┘
//! ```
//!
//! Deliveries are handled in arrival order. Classifications run concurrently
//! and the highest delivery sequence number wins. Disposing the widget stops
//! the actor and aborts any classification still in flight.

pub mod controller;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vox_agentic::ResultInterpreter;
use vox_intent_types::{Intent, NormalizedResult};

use crate::error::PipelineError;
pub use controller::{Delivery, IntentStatusController, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetId(Uuid);

impl WidgetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WidgetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the widget shows
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetView {
    /// Typed card for a recognized intent
    Intent(Intent),
    /// Pretty-printed dump of JSON that did not validate
    Fallback { pretty_json: String, reason: String },
}

impl WidgetView {
    pub fn fallback(raw: &JsonValue, reason: impl Into<String>) -> Self {
        WidgetView::Fallback {
            pretty_json: serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string()),
            reason: reason.into(),
        }
    }

    pub fn intent(&self) -> Option<&Intent> {
        match self {
            WidgetView::Intent(intent) => Some(intent),
            WidgetView::Fallback { .. } => None,
        }
    }
}

/// Published widget state. Display fields derive from `phase` + `normalized`.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSnapshot {
    pub id: WidgetId,
    pub view: WidgetView,
    pub phase: Phase,
    pub normalized: Option<NormalizedResult>,
    pub progress: u8,
    /// Why the executor call failed, when it did
    pub failure: Option<String>,
    /// Bumped on every publish
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl WidgetSnapshot {
    pub fn transaction_url(&self) -> Option<&str> {
        self.normalized
            .as_ref()
            .and_then(NormalizedResult::transaction_url)
    }

    /// Token balances in display order
    pub fn balances(&self) -> Vec<(&str, &str)> {
        self.normalized
            .as_ref()
            .and_then(NormalizedResult::balances)
            .map(|b| b.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug)]
pub(crate) enum WidgetEvent {
    /// A raw result from any source (may be empty or repeated)
    Deliver(Option<String>),
    /// The single executor call completed
    InvocationFinished(Result<String, PipelineError>),
    Dispose,
}

/// Handle to one widget. Dropping it disposes the widget.
pub struct IntentWidget {
    id: WidgetId,
    events: Option<mpsc::UnboundedSender<WidgetEvent>>,
    state: watch::Receiver<WidgetSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl IntentWidget {
    /// Start the actor for a recognized intent on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime. Use [`Self::spawn_on`]
    /// from synchronous code.
    pub fn spawn(intent: Intent, interpreter: Arc<ResultInterpreter>) -> Self {
        Self::spawn_on(&Handle::current(), intent, interpreter)
    }

    /// Start the actor for a recognized intent on the given runtime
    pub fn spawn_on(
        runtime: &Handle,
        intent: Intent,
        interpreter: Arc<ResultInterpreter>,
    ) -> Self {
        let id = WidgetId::new();
        let controller = IntentStatusController::new(intent.policy());
        let view = WidgetView::Intent(intent);

        let initial = build_snapshot(id, &view, &controller, 0);
        let (state_tx, state_rx) = watch::channel(initial);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let actor = WidgetActor {
            id,
            view,
            controller,
            interpreter,
            state: state_tx,
            version: 0,
        };
        let task = runtime.spawn(actor.run(events_rx));

        Self {
            id,
            events: Some(events_tx),
            state: state_rx,
            task: Some(task),
        }
    }

    /// Static widget for an unrecognized intent. No actor, stays `pending`.
    pub fn fallback(raw: &JsonValue, reason: impl Into<String>) -> Self {
        let id = WidgetId::new();
        let snapshot = WidgetSnapshot {
            id,
            view: WidgetView::fallback(raw, reason),
            phase: Phase::Pending,
            normalized: None,
            progress: 0,
            failure: None,
            version: 0,
            updated_at: Utc::now(),
        };
        let (_, state_rx) = watch::channel(snapshot);
        Self {
            id,
            events: None,
            state: state_rx,
            task: None,
        }
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every published change
    pub fn subscribe(&self) -> watch::Receiver<WidgetSnapshot> {
        self.state.clone()
    }

    /// Hand a raw result to the widget. Returns false if nothing is listening.
    pub fn deliver(&self, raw: Option<String>) -> bool {
        self.send(WidgetEvent::Deliver(raw))
    }

    pub(crate) fn send(&self, event: WidgetEvent) -> bool {
        match &self.events {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub(crate) fn event_sender(&self) -> Option<mpsc::UnboundedSender<WidgetEvent>> {
        self.events.clone()
    }

    /// Wait until the widget leaves `processing`, or its actor is gone.
    pub async fn settled(&self) -> WidgetSnapshot {
        let mut rx = self.state.clone();
        let settled = rx
            .wait_for(|s| s.phase != Phase::Processing)
            .await
            .map(|s| (*s).clone());
        match settled {
            Ok(snapshot) => snapshot,
            Err(_) => rx.borrow().clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the widget and drop any classification still running
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for IntentWidget {
    fn drop(&mut self) {
        if let Some(tx) = self.events.take() {
            let _ = tx.send(WidgetEvent::Dispose);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for IntentWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentWidget")
            .field("id", &self.id)
            .field("phase", &self.state.borrow().phase)
            .finish()
    }
}

fn build_snapshot(
    id: WidgetId,
    view: &WidgetView,
    controller: &IntentStatusController,
    version: u64,
) -> WidgetSnapshot {
    WidgetSnapshot {
        id,
        view: view.clone(),
        phase: controller.phase(),
        normalized: controller.normalized().cloned(),
        progress: controller.progress(),
        failure: controller.failure().map(str::to_string),
        version,
        updated_at: Utc::now(),
    }
}

struct WidgetActor {
    id: WidgetId,
    view: WidgetView,
    controller: IntentStatusController,
    interpreter: Arc<ResultInterpreter>,
    state: watch::Sender<WidgetSnapshot>,
    version: u64,
}

impl WidgetActor {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<WidgetEvent>) {
        let mut inflight: JoinSet<(u64, NormalizedResult)> = JoinSet::new();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(WidgetEvent::Deliver(raw)) => self.start(raw.as_deref(), &mut inflight),
                    Some(WidgetEvent::InvocationFinished(Ok(output))) => {
                        if output.trim().is_empty() {
                            self.fail(PipelineError::ExecutorInvocation(
                                "executor returned an empty result".to_string(),
                            ));
                        } else {
                            self.start(Some(&output), &mut inflight);
                        }
                    }
                    Some(WidgetEvent::InvocationFinished(Err(e))) => self.fail(e),
                    Some(WidgetEvent::Dispose) | None => break,
                },
                Some(joined) = inflight.join_next() => match joined {
                    Ok((seq, normalized)) => {
                        if self.controller.apply(seq, normalized) {
                            info!(widget = %self.id, phase = %self.controller.phase(), "Widget updated");
                            self.publish();
                        }
                    }
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => self.fail(PipelineError::Classification(e.to_string())),
                },
            }
        }

        inflight.abort_all();
        debug!(widget = %self.id, "Widget disposed");
    }

    fn start(&mut self, raw: Option<&str>, inflight: &mut JoinSet<(u64, NormalizedResult)>) {
        let Some(delivery) = self.controller.accept(raw) else {
            return;
        };

        let interpreter = self.interpreter.clone();
        let policy = self.controller.policy();
        debug!(widget = %self.id, seq = delivery.seq, "Classifying executor result");
        inflight.spawn(async move {
            let normalized = interpreter.interpret(policy, &delivery.raw).await;
            (delivery.seq, normalized)
        });
    }

    fn fail(&mut self, error: PipelineError) {
        warn!(widget = %self.id, "{}", error);
        if self.controller.fail_invocation(error.to_string()) {
            self.publish();
        }
    }

    fn publish(&mut self) {
        self.version += 1;
        let snapshot = build_snapshot(self.id, &self.view, &self.controller, self.version);
        self.state.send_replace(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use vox_intent_types::{BalanceIntent, ResultStatus, TransferIntent};

    fn transfer() -> Intent {
        Intent::Transfer(TransferIntent {
            amount: "5".to_string(),
            asset: "USDC".to_string(),
            receiver_address: "vitalik.eth".to_string(),
            chain: "base".to_string(),
        })
    }

    async fn next_change(rx: &mut watch::Receiver<WidgetSnapshot>) -> WidgetSnapshot {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("widget did not publish")
            .expect("widget actor stopped");
        let snapshot = rx.borrow_and_update().clone();
        snapshot
    }

    #[tokio::test]
    async fn test_delivery_is_classified() {
        let widget = IntentWidget::spawn(transfer(), Arc::new(ResultInterpreter::heuristic()));
        assert_eq!(widget.snapshot().phase, Phase::Processing);

        let mut rx = widget.subscribe();
        assert!(widget.deliver(Some(
            "Transaction successful: https://basescan.org/tx/0xabc123".to_string()
        )));

        let snapshot = next_change(&mut rx).await;
        assert_eq!(snapshot.phase, Phase::Success);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(
            snapshot.transaction_url(),
            Some("https://basescan.org/tx/0xabc123")
        );
        assert_eq!(snapshot.version, 1);
    }

    #[tokio::test]
    async fn test_invocation_failure() {
        let widget = IntentWidget::spawn(
            Intent::Balance(BalanceIntent::default()),
            Arc::new(ResultInterpreter::heuristic()),
        );
        widget.send(WidgetEvent::InvocationFinished(Err(
            PipelineError::ExecutorInvocation("refused".to_string()),
        )));

        let snapshot = widget.settled().await;
        assert_eq!(snapshot.phase, Phase::Fail);
        assert!(snapshot.balances().is_empty());
        assert_eq!(
            snapshot.normalized.as_ref().map(NormalizedResult::status),
            Some(ResultStatus::Fail)
        );
        assert!(snapshot.failure.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_empty_invocation_output_fails() {
        let widget = IntentWidget::spawn(transfer(), Arc::new(ResultInterpreter::heuristic()));
        widget.send(WidgetEvent::InvocationFinished(Ok("   ".to_string())));
        assert_eq!(widget.settled().await.phase, Phase::Fail);
    }

    #[tokio::test]
    async fn test_fallback_widget_is_static() {
        let widget = IntentWidget::fallback(&json!({"intent": "stake", "amount": "1"}), "unknown");
        assert!(!widget.deliver(Some("anything".to_string())));
        assert!(!widget.is_active());

        let snapshot = widget.settled().await;
        assert_eq!(snapshot.phase, Phase::Pending);
        match snapshot.view {
            WidgetView::Fallback { pretty_json, .. } => assert!(pretty_json.contains("\"stake\"")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispose_stops_actor() {
        let widget = IntentWidget::spawn(transfer(), Arc::new(ResultInterpreter::heuristic()));
        let rx = widget.subscribe();
        let sender = widget.event_sender().unwrap();
        widget.dispose();

        tokio::time::timeout(Duration::from_secs(5), async {
            while !sender.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(rx.has_changed().is_err());
        assert_eq!(rx.borrow().phase, Phase::Processing);
    }
}
