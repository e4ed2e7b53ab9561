//! ChatCoordinator - owns the conversation and dispatches queries.
//!
//! ## Architecture
//!
//! ```text
//!   presentation ──intent──▶ ChatCoordinator ──spawn_blocking──▶ QueryClient
//!        ▲                        │  (one Mutex)                      │
//!        │                        ├─ SessionState + UploadGate        │
//!        │                        ├─ HistoryStore (save per commit)   │
//!        └────── ChatEvent ───────┴─ EventBus ◀──── settle ───────────┘
//! ```
//!
//! Every intent and every dispatch completion is one critical section:
//! mutate, persist, emit. The lock is never held across an `.await`.
//!
//! ## Dispatch rules
//!
//! - At most one dispatch is in flight. A second `send` is rejected with
//!   [`SendRejected::DispatchInFlight`].
//! - Resets (`new_chat`, `clear_chat`, `complete_upload`) advance the session
//!   epoch and clear the typing flag. A dispatch from an older epoch is
//!   discarded when it settles; it never writes into the new conversation.
//! - The typing flag is cleared on every exit path, including a panic in the
//!   query client or the dispatch task being dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::client::{QueryClient, QueryRequest};
use crate::event_bus::{ChatEvent, EventBus};
use crate::session::{Message, MessageClock, MessageKind, SessionSnapshot, SessionState, UploadGate};
use crate::store::{HistoryStore, KeyValueStore, MemoryStore};

/// Why a `send` did nothing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    #[error("Message is empty")]
    EmptyText,

    #[error("Upload a file to begin")]
    UploadRequired,

    #[error("Agent is typing...")]
    DispatchInFlight,

    #[error("No async runtime available to dispatch the query")]
    NoRuntime,
}

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The agent's answer was appended.
    Answered(Message),

    /// The query failed; the fallback notice was appended.
    FellBack(Message),

    /// The conversation was reset while the query was in flight; nothing was appended.
    Discarded,
}

/// A dispatch in flight. Await [`DispatchHandle::wait`] for its outcome.
///
/// Dropping the handle does not cancel the dispatch.
#[derive(Debug)]
pub struct DispatchHandle {
    user_message: Message,
    task: JoinHandle<DispatchOutcome>,
    abandoned: AbandonedOutcome,
}

/// Where a dropped guard leaves its outcome for the handle.
type AbandonedOutcome = Arc<Mutex<Option<DispatchOutcome>>>;

impl DispatchHandle {
    /// The user message this dispatch appended.
    pub fn user_message(&self) -> &Message {
        &self.user_message
    }

    pub async fn wait(self) -> DispatchOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Dispatch task for {} failed: {}", self.user_message.id, e);
                // The task's guard settled the session when it was dropped.
                let outcome = self
                    .abandoned
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                outcome.unwrap_or(DispatchOutcome::Discarded)
            }
        }
    }
}

/// Builder for [`ChatCoordinator`].
pub struct ChatCoordinatorBuilder {
    client: Arc<dyn QueryClient>,
    store: Option<HistoryStore>,
    event_bus: Option<Arc<EventBus>>,
    runtime: Option<Handle>,
}

impl ChatCoordinatorBuilder {
    fn new(client: Arc<dyn QueryClient>) -> Self {
        Self {
            client,
            store: None,
            event_bus: None,
            runtime: None,
        }
    }

    /// Persist history in `medium`. Defaults to a [`MemoryStore`].
    pub fn store(mut self, medium: impl KeyValueStore + 'static) -> Self {
        self.store = Some(HistoryStore::new(medium));
        self
    }

    /// Use an existing EventBus (for sharing with other components).
    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Spawn dispatches on this runtime instead of the caller's.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the coordinator, restoring any stored history.
    pub fn build(self) -> ChatCoordinator {
        let history = self
            .store
            .unwrap_or_else(|| HistoryStore::new(MemoryStore::new()));
        let restored = history.load().unwrap_or_default();
        if !restored.is_empty() {
            log::info!("Restored chat with {} messages", restored.len());
        }

        let inner = Inner {
            clock: MessageClock::resuming_after(&restored),
            session: SessionState::restored(restored),
            gate: UploadGate::default(),
            history,
            epoch: 0,
        };

        ChatCoordinator {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                client: self.client,
                events: self.event_bus.unwrap_or_else(|| Arc::new(EventBus::new())),
                runtime: self.runtime,
            }),
        }
    }
}

/// The chat session coordinator.
///
/// Cloning is cheap and clones share the same session.
#[derive(Clone)]
pub struct ChatCoordinator {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    client: Arc<dyn QueryClient>,
    events: Arc<EventBus>,
    runtime: Option<Handle>,
}

struct Inner {
    session: SessionState,
    gate: UploadGate,
    clock: MessageClock,
    history: HistoryStore,
    /// Advanced by every reset; dispatches from older epochs are stale.
    epoch: u64,
}

enum Reply {
    Answer(String),
    Fallback,
}

impl ChatCoordinator {
    pub fn builder(client: Arc<dyn QueryClient>) -> ChatCoordinatorBuilder {
        ChatCoordinatorBuilder::new(client)
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().session.messages().to_vec()
    }

    pub fn is_agent_typing(&self) -> bool {
        self.shared.lock().session.is_agent_typing()
    }

    pub fn is_upload_open(&self) -> bool {
        self.shared.lock().gate.is_open()
    }

    /// All presentation state, read atomically.
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.shared.lock();
        SessionSnapshot {
            messages: inner.session.messages().to_vec(),
            is_agent_typing: inner.session.is_agent_typing(),
            is_upload_open: inner.gate.is_open(),
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChatEvent> {
        self.shared.events.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.shared.events
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Append `text` as a user message and query the agent about it.
    ///
    /// The user message and the typing flag are committed before this
    /// returns. The remote call runs on the runtime's blocking pool.
    pub fn send(&self, text: &str) -> Result<DispatchHandle, SendRejected> {
        if text.trim().is_empty() {
            return Err(SendRejected::EmptyText);
        }
        let runtime = self
            .shared
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or(SendRejected::NoRuntime)?;

        let (user_message, epoch) = {
            let mut inner = self.shared.lock();
            if !inner.gate.is_open() {
                return Err(SendRejected::UploadRequired);
            }
            if inner.session.is_agent_typing() {
                return Err(SendRejected::DispatchInFlight);
            }

            let message = inner.clock.mint(MessageKind::User, text);
            inner.session.push(message.clone());
            inner.session.set_agent_typing(true);
            inner.persist();

            self.shared.emit(ChatEvent::MessageAppended(message.clone()));
            self.shared.emit(ChatEvent::TypingChanged(true));
            (message, inner.epoch)
        };
        log::debug!("Dispatching {} (epoch {})", user_message.id, epoch);

        // From here on the guard owns clearing the typing flag.
        let abandoned = AbandonedOutcome::default();
        let guard = DispatchGuard {
            shared: Some(Arc::clone(&self.shared)),
            epoch,
            abandoned: Arc::clone(&abandoned),
        };
        let client = Arc::clone(&self.shared.client);
        let request = QueryRequest {
            query: text.to_string(),
        };

        let task = runtime.spawn(async move {
            let result = tokio::task::spawn_blocking(move || client.query(&request)).await;
            let reply = match result {
                Ok(Ok(response)) if !response.answer.trim().is_empty() => {
                    Reply::Answer(response.answer)
                }
                Ok(Ok(_)) => {
                    log::warn!("Query returned an empty answer");
                    Reply::Fallback
                }
                Ok(Err(e)) => {
                    log::warn!("Query failed: {}", e);
                    Reply::Fallback
                }
                Err(e) => {
                    log::error!("Query worker failed: {}", e);
                    Reply::Fallback
                }
            };
            guard.settle(reply)
        });

        Ok(DispatchHandle {
            user_message,
            task,
            abandoned,
        })
    }

    /// Start over: empty history, gate closed.
    pub fn new_chat(&self) {
        let mut inner = self.shared.lock();
        inner.epoch += 1;
        inner.session.replace(Vec::new());
        let typing_changed = inner.session.set_agent_typing(false);
        let gate_changed = inner.gate.close();
        inner.persist();

        self.shared.emit(ChatEvent::HistoryReset(Vec::new()));
        if typing_changed {
            self.shared.emit(ChatEvent::TypingChanged(false));
        }
        if gate_changed {
            self.shared.emit(ChatEvent::GateChanged(false));
        }
        log::info!("New chat started");
    }

    /// Empty the history. The gate stays as it is.
    pub fn clear_chat(&self) {
        let mut inner = self.shared.lock();
        inner.epoch += 1;
        inner.session.replace(Vec::new());
        let typing_changed = inner.session.set_agent_typing(false);
        inner.persist();

        self.shared.emit(ChatEvent::HistoryReset(Vec::new()));
        if typing_changed {
            self.shared.emit(ChatEvent::TypingChanged(false));
        }
        log::info!("Chat cleared");
    }

    /// A document was indexed: open the gate and replace history with the announcement.
    pub fn complete_upload(&self, filename: &str) {
        let mut inner = self.shared.lock();
        inner.epoch += 1;
        let announcement = inner.clock.upload_announcement(filename);
        inner.session.replace(vec![announcement.clone()]);
        let typing_changed = inner.session.set_agent_typing(false);
        let gate_changed = inner.gate.open();
        inner.persist();

        self.shared.emit(ChatEvent::HistoryReset(vec![announcement]));
        if typing_changed {
            self.shared.emit(ChatEvent::TypingChanged(false));
        }
        if gate_changed {
            self.shared.emit(ChatEvent::GateChanged(true));
        }
        log::info!("Upload complete: {}", filename);
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic mid-commit leaves the session consistent enough to keep chatting.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ChatEvent) {
        self.events.emit(event);
    }

    /// Reconcile a finished dispatch into the session.
    fn settle(&self, epoch: u64, reply: Reply) -> DispatchOutcome {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            log::debug!(
                "Discarding reply from epoch {} (now {})",
                epoch,
                inner.epoch
            );
            return DispatchOutcome::Discarded;
        }

        let (message, answered) = match reply {
            Reply::Answer(text) => (inner.clock.mint(MessageKind::Agent, text), true),
            Reply::Fallback => (inner.clock.fallback(), false),
        };
        inner.session.push(message.clone());
        inner.session.set_agent_typing(false);
        inner.persist();

        self.emit(ChatEvent::MessageAppended(message.clone()));
        self.emit(ChatEvent::TypingChanged(false));

        if answered {
            DispatchOutcome::Answered(message)
        } else {
            DispatchOutcome::FellBack(message)
        }
    }
}

impl Inner {
    fn persist(&self) {
        self.history.save(self.session.messages());
    }
}

/// Settles a dispatch exactly once, even if its task never finishes normally.
struct DispatchGuard {
    shared: Option<Arc<Shared>>,
    epoch: u64,
    abandoned: AbandonedOutcome,
}

impl DispatchGuard {
    fn settle(mut self, reply: Reply) -> DispatchOutcome {
        match self.shared.take() {
            Some(shared) => shared.settle(self.epoch, reply),
            None => DispatchOutcome::Discarded,
        }
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            log::warn!("Dispatch abandoned before settling");
            let outcome = shared.settle(self.epoch, Reply::Fallback);
            *self
                .abandoned
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        }
    }
}
