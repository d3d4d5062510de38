//! A live wizard conversation: state, transcript, delayed
//! assistant replies, and the finalize guard.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::finalize::{FinalizeOutcome, Finalizer, SubmissionGuard, SubmissionState};
use super::machine::{BotReply, ReplyDelay, Selection, Wizard, WizardInput};
use super::model::CollectedProfile;
use super::prompts;
use super::state::WizardStep;
use super::transcript::{Transcript, TranscriptEntry};
use crate::config::ReplyPacing;
use crate::error::{Error, WizardError};

/// Default broadcast channel capacity.
const EVENT_CAPACITY: usize = 64;

/// Sessions untouched for this long are dropped from the registry.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Pushed to subscribers as the conversation changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// An entry was appended.
    Entry { entry: TranscriptEntry },
    /// The transcript was cleared; a fresh greeting follows.
    Reset,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub step: WizardStep,
    pub placeholder: &'static str,
    pub transcript: Vec<TranscriptEntry>,
    pub profile: CollectedProfile,
    pub submission: SubmissionState,
}

struct SessionInner {
    wizard: Wizard,
    transcript: Transcript,
    /// Bumped on reset; deliveries scheduled under an older epoch are dropped.
    epoch: u64,
    pending: Vec<JoinHandle<()>>,
    last_active: Instant,
}

/// One user's run through the wizard.
pub struct WizardSession {
    id: Uuid,
    pacing: ReplyPacing,
    inner: Arc<Mutex<SessionInner>>,
    events: broadcast::Sender<SessionEvent>,
    guard: SubmissionGuard,
}

impl WizardSession {
    /// Start a session; the greeting is already in the transcript.
    pub fn new(pacing: ReplyPacing) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::assistant(Wizard::greeting().text));

        let id = Uuid::new_v4();
        info!(session_id = %id, "Wizard session started");

        Self {
            id,
            pacing,
            inner: Arc::new(Mutex::new(SessionInner {
                wizard: Wizard::new(),
                transcript,
                epoch: 0,
                pending: Vec::new(),
                last_active: Instant::now(),
            })),
            events,
            guard: SubmissionGuard::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Receive entries as they land.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn step(&self) -> WizardStep {
        self.inner.lock().await.wizard.step()
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.lock().await.transcript.entries().to_vec()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let submission = self.guard.state().await;
        let inner = self.inner.lock().await;
        let step = inner.wizard.step();
        SessionSnapshot {
            id: self.id,
            step,
            placeholder: prompts::placeholder(step),
            transcript: inner.transcript.entries().to_vec(),
            profile: inner.wizard.profile().clone(),
            submission,
        }
    }

    /// Free text from the input box.
    pub async fn send_text(&self, text: &str) -> Result<WizardStep, WizardError> {
        self.handle(WizardInput::Text(text.to_string())).await
    }

    /// A button or chip.
    pub async fn select(&self, selection: Selection) -> Result<WizardStep, WizardError> {
        self.handle(WizardInput::Select(selection)).await
    }

    /// Apply one event: echo the user's entry now, schedule the replies.
    pub async fn handle(&self, input: WizardInput) -> Result<WizardStep, WizardError> {
        let mut inner = self.inner.lock().await;
        inner.last_active = Instant::now();
        let turn = inner.wizard.handle(input)?;

        if let Some(text) = turn.user_entry {
            append(&mut inner, &self.events, TranscriptEntry::user(text));
        }
        if let Some((from, to)) = turn.transition {
            info!(session_id = %self.id, from = %from, to = %to, "Wizard step changed");
        }
        self.schedule(&mut inner, turn.replies);

        Ok(inner.wizard.step())
    }

    /// Clear everything and greet again. Pending replies are cancelled.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.last_active = Instant::now();
        cancel_pending(&mut inner);
        inner.transcript.clear();
        let greeting = inner.wizard.reset();
        let _ = self.events.send(SessionEvent::Reset);
        append(&mut inner, &self.events, TranscriptEntry::assistant(greeting.text));
        info!(session_id = %self.id, epoch = inner.epoch, "Wizard session reset");
    }

    /// Wait until every scheduled reply has been delivered (or cancelled).
    pub async fn settle(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut inner = self.inner.lock().await;
                inner.pending.drain(..).collect()
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
    }

    /// Finalize the current draft. See [`Finalizer::finalize`].
    ///
    /// An incomplete draft fails the completeness check; a complete one is
    /// only submitted once the user has confirmed it (`Completed`). The
    /// wizard step is left untouched whatever the outcome.
    pub async fn finalize(&self, finalizer: &Finalizer) -> Result<FinalizeOutcome, Error> {
        let (step, draft) = {
            let mut inner = self.inner.lock().await;
            inner.last_active = Instant::now();
            (inner.wizard.step(), inner.wizard.profile().clone())
        };
        if draft.is_complete() && step != WizardStep::Completed {
            return Err(WizardError::UnexpectedEvent {
                step,
                event: "finalize".to_string(),
            }
            .into());
        }
        Ok(finalizer.finalize(&self.guard, &draft).await?)
    }

    /// Time since the last event, reset or finalize request.
    pub async fn idle_for(&self) -> Duration {
        self.inner.lock().await.last_active.elapsed()
    }

    async fn touch(&self) {
        self.inner.lock().await.last_active = Instant::now();
    }

    /// Cancel pending replies; the session is being dropped.
    async fn close(&self) {
        cancel_pending(&mut *self.inner.lock().await);
    }

    fn schedule(&self, inner: &mut SessionInner, replies: Vec<BotReply>) {
        let (now, later): (Vec<BotReply>, Vec<BotReply>) = replies
            .into_iter()
            .partition(|r| r.delay == ReplyDelay::None);
        for reply in now {
            append(inner, &self.events, TranscriptEntry::assistant(reply.text));
        }
        if later.is_empty() {
            return;
        }

        // One task per turn keeps replies of a turn in order even at zero delay.
        let start = Instant::now();
        let epoch = inner.epoch;
        let pacing = self.pacing;
        let shared = Arc::clone(&self.inner);
        let events = self.events.clone();
        let session_id = self.id;

        inner.pending.retain(|h| !h.is_finished());
        inner.pending.push(tokio::spawn(async move {
            for reply in later {
                tokio::time::sleep_until(start + delay_for(pacing, reply.delay)).await;
                let mut inner = shared.lock().await;
                if inner.epoch != epoch {
                    debug!(session_id = %session_id, "Dropping reply from before reset");
                    return;
                }
                append(&mut inner, &events, TranscriptEntry::assistant(reply.text));
            }
        }));
    }
}

/// Abort every scheduled delivery and invalidate any that already woke.
fn cancel_pending(inner: &mut SessionInner) {
    for handle in inner.pending.drain(..) {
        handle.abort();
    }
    inner.epoch += 1;
}

fn delay_for(pacing: ReplyPacing, delay: ReplyDelay) -> Duration {
    match delay {
        ReplyDelay::None => Duration::ZERO,
        ReplyDelay::Short => pacing.short,
        ReplyDelay::Summary => pacing.summary,
    }
}

fn append(
    inner: &mut SessionInner,
    events: &broadcast::Sender<SessionEvent>,
    entry: TranscriptEntry,
) {
    inner.transcript.push(entry.clone());
    // Ok if nobody is subscribed
    let _ = events.send(SessionEvent::Entry { entry });
}

/// All live sessions, keyed by id.
///
/// Sessions idle for longer than the TTL are pruned on every `create` and by
/// [`spawn_expiry_task`].
pub struct SessionRegistry {
    pacing: ReplyPacing,
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Arc<WizardSession>>>,
}

impl SessionRegistry {
    pub fn new(pacing: ReplyPacing) -> Arc<Self> {
        Self::with_ttl(pacing, DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(pacing: ReplyPacing, ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            pacing,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn pacing(&self) -> ReplyPacing {
        self.pacing
    }

    /// Start and register a new session.
    pub async fn create(&self) -> Arc<WizardSession> {
        self.expire_idle().await;
        let session = Arc::new(WizardSession::new(self.pacing));
        self.sessions
            .write()
            .await
            .insert(session.id(), Arc::clone(&session));
        session
    }

    /// Look up a session and mark it active.
    pub async fn get(&self, id: Uuid) -> Result<Arc<WizardSession>, WizardError> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(WizardError::SessionNotFound(id))?;
        session.touch().await;
        Ok(session)
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for at least the TTL, cancelling their pending
    /// replies. Returns the number of sessions expired.
    pub async fn expire_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;

        let mut idle = Vec::new();
        for (id, session) in sessions.iter() {
            if session.idle_for().await >= self.ttl {
                idle.push(*id);
            }
        }

        for id in &idle {
            if let Some(session) = sessions.remove(id) {
                session.close().await;
                debug!(session_id = %id, "Wizard session expired");
            }
        }

        if !idle.is_empty() {
            info!(count = idle.len(), "Expired idle wizard sessions");
        }
        idle.len()
    }
}

/// Spawn a background task that periodically expires idle sessions.
pub fn spawn_expiry_task(registry: Arc<SessionRegistry>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            registry.expire_idle().await;
        }
    })
}
