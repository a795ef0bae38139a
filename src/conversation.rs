//! Conversation transcript
//!
//! Holds the chat messages and the widget attached to each intent message.
//! Assistant text may arrive in chunks; only a finalized message is handed
//! to the transcript extractor, and each message dispatches at most once.
//!
//! The message list is published through a watch channel after every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;
use vox_agentic::extract_intent;

use crate::dispatcher::Dispatcher;
use crate::error::PipelineError;
use crate::widget::{IntentWidget, WidgetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
    Status,
    /// Assistant message whose text carried an intent
    Intent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub content: String,
    pub streaming: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(kind: MessageKind, content: impl Into<String>, streaming: bool) -> Self {
        Self {
            id: MessageId::new(),
            kind,
            content: content.into(),
            streaming,
            created_at: Utc::now(),
        }
    }
}

/// What finalizing an assistant message produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalized {
    PlainText,
    Intent { widget: WidgetId, recognized: bool },
}

/// Chat transcript plus the widget of every intent message.
///
/// Finalizing an intent message spawns tasks through the [`Dispatcher`].
/// Outside a tokio runtime, build the dispatcher with
/// [`Dispatcher::on_runtime`]; otherwise finalizing panics.
pub struct Conversation {
    dispatcher: Arc<Dispatcher>,
    messages: Vec<Message>,
    widgets: HashMap<MessageId, IntentWidget>,
    updates: watch::Sender<Vec<Message>>,
}

impl Conversation {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            dispatcher,
            messages: Vec::new(),
            widgets: HashMap::new(),
            updates,
        }
    }

    pub fn push_user(&mut self, text: &str) -> MessageId {
        self.push(Message::new(MessageKind::User, text, false))
    }

    pub fn push_status(&mut self, text: &str) -> MessageId {
        self.push(Message::new(MessageKind::Status, text, false))
    }

    /// Open an empty assistant message for streamed text
    pub fn begin_assistant(&mut self) -> MessageId {
        self.push(Message::new(MessageKind::Assistant, "", true))
    }

    pub fn push_chunk(&mut self, id: MessageId, chunk: &str) -> Result<(), PipelineError> {
        let message = self.message_mut(id)?;
        if !message.streaming {
            return Err(PipelineError::NotStreaming(id));
        }
        message.content.push_str(chunk);
        self.publish();
        Ok(())
    }

    /// Close a streamed message and dispatch its intent, if it has one.
    ///
    /// Calling this again for the same message never dispatches twice.
    /// Dispatching needs a runtime, see [`Dispatcher::dispatch`].
    pub fn finalize_assistant(&mut self, id: MessageId) -> Result<Finalized, PipelineError> {
        if let Some(widget) = self.widgets.get(&id) {
            let recognized = widget.snapshot().view.intent().is_some();
            return Ok(Finalized::Intent {
                widget: widget.id(),
                recognized,
            });
        }

        let message = self.message_mut(id)?;
        if message.kind != MessageKind::Assistant {
            return Err(PipelineError::NotStreaming(id));
        }
        message.streaming = false;

        let Some(extracted) = extract_intent(&message.content) else {
            debug!(message = %id, "Assistant message has no intent");
            self.publish();
            return Ok(Finalized::PlainText);
        };

        message.kind = MessageKind::Intent;
        let recognized = extracted.is_recognized();
        let widget = self.dispatcher.dispatch(extracted);
        let widget_id = widget.id();
        info!(message = %id, widget = %widget_id, recognized, "Intent message finalized");

        self.widgets.insert(id, widget);
        self.publish();
        Ok(Finalized::Intent {
            widget: widget_id,
            recognized,
        })
    }

    /// Append a complete assistant reply in one step
    pub fn push_assistant(&mut self, text: &str) -> Result<(MessageId, Finalized), PipelineError> {
        let id = self.begin_assistant();
        self.push_chunk(id, text)?;
        let outcome = self.finalize_assistant(id)?;
        Ok((id, outcome))
    }

    /// Remove a message, disposing its widget. Returns false if unknown.
    pub fn remove(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        if let Some(widget) = self.widgets.remove(&id) {
            debug!(message = %id, widget = %widget.id(), "Disposing widget");
            widget.dispose();
        }
        let removed = self.messages.len() != before;
        if removed {
            self.publish();
        }
        removed
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn widget(&self, id: MessageId) -> Option<&IntentWidget> {
        self.widgets.get(&id)
    }

    /// Widgets in message order
    pub fn widgets(&self) -> impl Iterator<Item = (&Message, &IntentWidget)> {
        self.messages
            .iter()
            .filter_map(|m| self.widgets.get(&m.id).map(|w| (m, w)))
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.updates.subscribe()
    }

    fn push(&mut self, message: Message) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        self.publish();
        id
    }

    fn message_mut(&mut self, id: MessageId) -> Result<&mut Message, PipelineError> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(PipelineError::UnknownMessage(id))
    }

    fn publish(&self) {
        self.updates.send_replace(self.messages.clone());
    }
}
