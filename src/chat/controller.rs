//! Chat session controller
//!
//! Owns the authoritative message log, session id, readiness status,
//! summary, and feedback state, and orchestrates the send / end /
//! feedback / resume flows against the backend gateway. Three background
//! tasks belong to the controller's lifecycle: the readiness poller, the
//! readiness fallback timer, and the inactivity watch. All of them hang
//! off one `CancellationToken`, and every state write that follows an
//! await is guarded by that token, so a torn-down controller never
//! applies a late network result.

use crate::chat::message::Message;
use crate::chat::session::{Feedback, Session, Summary, UserStatus};
use crate::config::ChatConfig;
use crate::error::{FindastroError, Result};
use crate::gateway::types::{ChatRequest, EndChatRequest, FeedbackRequest, UserStatusResponse};
use crate::gateway::Backend;
use crate::session_store::SessionStore;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Timing knobs for the controller's background tasks
#[derive(Debug, Clone, Copy)]
pub struct ChatTiming {
    /// Interval between readiness polls while the profile is processing
    pub status_poll_interval: Duration,
    /// How long to wait before forcing readiness when the status
    /// endpoint stays silent
    pub status_fallback: Duration,
    /// Idle time before the inactivity prompt is raised
    pub inactivity_timeout: Duration,
}

impl ChatTiming {
    /// Build timing from the chat configuration section
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            status_poll_interval: Duration::from_secs(config.status_poll_interval_seconds),
            status_fallback: Duration::from_secs(config.status_fallback_seconds),
            inactivity_timeout: Duration::from_secs(config.inactivity_timeout_seconds),
        }
    }
}

impl Default for ChatTiming {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// State transitions the presentation layer may want to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// The readiness status changed
    StatusChanged(UserStatus),
    /// The backend reported a new wallet balance
    WalletUpdated(f64),
    /// The session idled past the inactivity timeout
    InactivityPrompt,
}

/// What happened to a `send` attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The backend replied and an assistant message was appended
    Delivered,
    /// The call failed; a generic error reply was appended instead
    Failed,
    /// The attempt was silently dropped (blank text, another send
    /// outstanding, status not ready, or controller torn down)
    Dropped,
}

struct ChatState {
    session: Session,
    status: UserStatus,
    summary: Option<Summary>,
    feedback: Feedback,
    wallet_balance: Option<f64>,
    sending: bool,
    inactivity_prompt: bool,
    last_activity: Instant,
}

impl ChatState {
    fn new() -> Self {
        Self {
            session: Session::new(),
            status: UserStatus::Checking,
            summary: None,
            feedback: Feedback::default(),
            wallet_balance: None,
            sending: false,
            inactivity_prompt: false,
            last_activity: Instant::now(),
        }
    }
}

/// Orchestrates one mounted chat session
///
/// Construct with [`ChatController::new`], call [`ChatController::start`]
/// once, then drive it from user input. Call
/// [`ChatController::shutdown`] (or drop it) to cancel the background
/// tasks deterministically.
pub struct ChatController {
    backend: Arc<dyn Backend>,
    store: Arc<SessionStore>,
    state: Arc<Mutex<ChatState>>,
    timing: ChatTiming,
    cancel: CancellationToken,
    events: UnboundedSender<ControllerEvent>,
    activity: Arc<Notify>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChatController {
    /// Create a controller and the event stream the shell renders from
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<SessionStore>,
        timing: ChatTiming,
    ) -> (Self, UnboundedReceiver<ControllerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            backend,
            store,
            state: Arc::new(Mutex::new(ChatState::new())),
            timing,
            cancel: CancellationToken::new(),
            events,
            activity: Arc::new(Notify::new()),
            tasks: Mutex::new(Vec::new()),
        };
        (controller, receiver)
    }

    /// Resume or start the session and launch the background tasks
    ///
    /// With `new_session` the history fetch is skipped and the freshly
    /// minted session is kept. Otherwise the most recent server-held
    /// session is adopted wholesale when the local log is still at its
    /// untouched initial state; a failed history fetch is logged and the
    /// fresh session stands.
    pub async fn start(&self, new_session: bool) {
        if new_session {
            debug!("Starting a fresh session by request");
        } else {
            self.resume_from_history().await;
        }
        self.spawn_status_watch();
        self.spawn_status_fallback();
        self.spawn_inactivity_watch();
    }

    async fn resume_from_history(&self) {
        let Some(mobile) = self.store.mobile() else {
            return;
        };
        match self.backend.chat_history(&mobile).await {
            Ok(response) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                let Some(recent) = response.sessions.into_iter().next() else {
                    return;
                };
                if recent.messages.is_empty() {
                    return;
                }
                let mut state = self.lock();
                if state.session.is_at_initial_state() {
                    debug!(
                        "Resuming session {} with {} messages",
                        recent.session_id,
                        recent.messages.len()
                    );
                    state.session.adopt(recent.session_id, recent.messages);
                }
            }
            Err(e) => warn!("Failed to load chat history: {}", e),
        }
    }

    /// Send one user message
    ///
    /// Silently dropped when the text is blank, another send is
    /// outstanding, or the profile is not ready. The user message is
    /// appended optimistically; the assistant reply (or a generic error
    /// reply) follows when the call completes. Exactly one send may be
    /// outstanding at a time.
    pub async fn send(&self, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Dropped);
        }

        let (history, session_id) = {
            let mut state = self.lock();
            if state.sending || state.status != UserStatus::Ready {
                return Ok(SendOutcome::Dropped);
            }
            state.sending = true;
            state.inactivity_prompt = false;
            state.last_activity = Instant::now();
            let history = state.session.history_for_send();
            let session_id = state.session.session_id.clone();
            state.session.messages.push(Message::user(text));
            (history, session_id)
        };
        self.activity.notify_one();

        let Some(mobile) = self.store.mobile() else {
            let mut state = self.lock();
            state.sending = false;
            state.session.messages.push(Message::assistant(
                crate::chat::message::SESSION_ERROR_REPLY,
                crate::chat::message::AssistantKind::Advisor,
            ));
            return Ok(SendOutcome::Failed);
        };

        let request = ChatRequest {
            mobile,
            message: text.to_string(),
            history,
            session_id,
        };
        let result = self.backend.send_chat(request).await;

        if self.cancel.is_cancelled() {
            // Torn down while the call was outstanding; discard the result.
            return Ok(SendOutcome::Dropped);
        }

        let mut state = self.lock();
        state.sending = false;
        state.last_activity = Instant::now();
        let outcome = match result {
            Ok(response) => {
                if let Some(balance) = response.wallet_balance {
                    state.wallet_balance = Some(balance);
                    let _ = self.events.send(ControllerEvent::WalletUpdated(balance));
                }
                // Only the newest assistant message may carry the flag.
                state.session.clear_animation();
                state.session.messages.push(Message::from_response(response));
                SendOutcome::Delivered
            }
            Err(e) => {
                tracing::error!("Chat send failed: {}", e);
                state.session.messages.push(Message::error_reply());
                SendOutcome::Failed
            }
        };
        drop(state);
        self.activity.notify_one();
        Ok(outcome)
    }

    /// End the consultation and fetch its summary
    ///
    /// Rejected without a network call when the log is empty. On failure
    /// the error is surfaced and the session stays open; the user may
    /// retry or keep chatting. `keep_feedback` preserves any feedback
    /// draft across the summary refresh.
    pub async fn end(&self, keep_feedback: bool) -> Result<Summary> {
        let (history, session_id) = {
            let mut state = self.lock();
            if state.session.messages.is_empty() {
                return Err(
                    FindastroError::Validation("There is nothing to summarize yet.".into()).into(),
                );
            }
            state.inactivity_prompt = false;
            (
                state.session.messages.clone(),
                state.session.session_id.clone(),
            )
        };
        let mobile = self.store.mobile().ok_or(FindastroError::NotLoggedIn)?;

        let request = EndChatRequest {
            mobile,
            history,
            session_id,
        };
        let response = self
            .backend
            .end_chat(request)
            .await
            .map_err(FindastroError::Api)?;

        let summary = Summary {
            text: response.summary,
        };
        if !self.cancel.is_cancelled() {
            let mut state = self.lock();
            state.summary = Some(summary.clone());
            if !keep_feedback {
                state.feedback = Feedback::default();
            }
        }
        Ok(summary)
    }

    /// Submit the session rating
    ///
    /// A zero rating fails fast with a validation error and no network
    /// call. Success marks feedback finalized and fires a best-effort
    /// end-chat so the backend's record is closed; that secondary call's
    /// failure is logged and never surfaced.
    pub async fn submit_feedback(&self, rating: u8, comment: &str) -> Result<()> {
        if rating < 1 {
            return Err(FindastroError::Validation("Please provide a rating.".into()).into());
        }
        if rating > 5 {
            return Err(
                FindastroError::Validation("Ratings go from 1 to 5 stars.".into()).into(),
            );
        }
        let (session_id, history) = {
            let state = self.lock();
            if state.feedback.submitted {
                return Err(FindastroError::Validation(
                    "Feedback was already submitted for this session.".into(),
                )
                .into());
            }
            (
                state.session.session_id.clone(),
                state.session.messages.clone(),
            )
        };
        let mobile = self.store.mobile().ok_or(FindastroError::NotLoggedIn)?;

        let request = FeedbackRequest {
            mobile: mobile.clone(),
            session_id: session_id.clone(),
            rating,
            feedback: comment.to_string(),
        };
        self.backend
            .submit_feedback(request)
            .await
            .map_err(FindastroError::Api)?;

        if self.cancel.is_cancelled() {
            return Ok(());
        }
        {
            let mut state = self.lock();
            state.feedback = Feedback {
                rating,
                comment: comment.to_string(),
                submitted: true,
            };
        }

        // Best-effort close of the backend's record. The task belongs to
        // this controller's lifecycle and its failure is only logged.
        let backend = self.backend.clone();
        let cancel = self.cancel.clone();
        let request = EndChatRequest {
            mobile,
            history,
            session_id,
        };
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = backend.end_chat(request) => match result {
                    Ok(_) => debug!("Backend session record closed after feedback"),
                    Err(e) => warn!("Silent end-chat after feedback failed: {}", e),
                },
            }
        });
        self.push_task(handle);
        Ok(())
    }

    /// Reset to a fresh session
    ///
    /// Clears the log back to the greeting, mints a new session id, and
    /// resets summary and feedback. The stored identity is untouched.
    pub fn new_session(&self) {
        {
            let mut state = self.lock();
            state.session = Session::new();
            state.summary = None;
            state.feedback = Feedback::default();
            state.inactivity_prompt = false;
            state.last_activity = Instant::now();
        }
        self.activity.notify_one();
    }

    /// Discard the summary and keep the session open ("review chat")
    pub fn dismiss_summary(&self) {
        {
            let mut state = self.lock();
            state.summary = None;
            state.last_activity = Instant::now();
        }
        self.activity.notify_one();
    }

    /// Dismiss the inactivity prompt and re-arm the idle clock
    pub fn dismiss_inactivity_prompt(&self) {
        {
            let mut state = self.lock();
            state.inactivity_prompt = false;
            state.last_activity = Instant::now();
        }
        self.activity.notify_one();
    }

    /// Snapshot of the message log
    pub fn messages(&self) -> Vec<Message> {
        self.lock().session.messages.clone()
    }

    /// The newest message, if any
    pub fn last_message(&self) -> Option<Message> {
        self.lock().session.messages.last().cloned()
    }

    /// Current readiness status
    pub fn status(&self) -> UserStatus {
        self.lock().status
    }

    /// Current summary, if the consultation was ended
    pub fn summary(&self) -> Option<Summary> {
        self.lock().summary.clone()
    }

    /// Current feedback state
    pub fn feedback(&self) -> Feedback {
        self.lock().feedback.clone()
    }

    /// Last reported wallet balance
    pub fn wallet_balance(&self) -> Option<f64> {
        self.lock().wallet_balance
    }

    /// The active session id
    pub fn session_id(&self) -> String {
        self.lock().session.session_id.clone()
    }

    /// True while a send is outstanding
    pub fn is_sending(&self) -> bool {
        self.lock().sending
    }

    /// True while the inactivity prompt is raised
    pub fn inactivity_prompt_active(&self) -> bool {
        self.lock().inactivity_prompt
    }

    /// Clear the reveal flag once the newest reply finished animating
    pub fn clear_animation(&self) {
        self.lock().session.clear_animation();
    }

    /// Cancel the background tasks and wait for them to exit
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self
                .tasks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            tasks.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push_task(&self, handle: JoinHandle<()>) {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }

    /// Initial status check, then a poll loop while the profile is
    /// processing. A failed initial check degrades to ready rather than
    /// locking the user out; poll-cycle errors are logged and polling
    /// continues.
    fn spawn_status_watch(&self) {
        let Some(mobile) = self.store.mobile() else {
            return;
        };
        let backend = self.backend.clone();
        let store = self.store.clone();
        let state = self.state.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        let poll_interval = self.timing.status_poll_interval;

        let handle = tokio::spawn(async move {
            let initial = tokio::select! {
                _ = cancel.cancelled() => return,
                result = backend.user_status(&mobile) => result,
            };
            match initial {
                Ok(response) => {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let status = apply_status(&state, &events, &store, response);
                    if status != UserStatus::Processing {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Status check failed, assuming ready: {}", e);
                    if cancel.is_cancelled() {
                        return;
                    }
                    set_status(&state, &events, UserStatus::Ready);
                    return;
                }
            }

            let mut interval = time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await; // consume the immediate first tick
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = interval.tick() => {}
                }
                let result = tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = backend.user_status(&mobile) => result,
                };
                match result {
                    Ok(response) => {
                        if cancel.is_cancelled() {
                            return;
                        }
                        let status = apply_status(&state, &events, &store, response);
                        if status.is_settled() {
                            debug!("Profile status settled at {}, polling stopped", status);
                            return;
                        }
                    }
                    Err(e) => warn!("Status polling error: {}", e),
                }
            }
        });
        self.push_task(handle);
    }

    /// Forces checking → ready after a bounded wait so a slow or broken
    /// status endpoint cannot lock the user out permanently.
    fn spawn_status_fallback(&self) {
        let state = self.state.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        let fallback = self.timing.status_fallback;

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = time::sleep(fallback) => {}
            }
            let forced = {
                let mut guard = lock_state(&state);
                if guard.status == UserStatus::Checking {
                    warn!("No status response after {:?}, forcing ready", fallback);
                    guard.status = UserStatus::Ready;
                    true
                } else {
                    false
                }
            };
            if forced {
                let _ = events.send(ControllerEvent::StatusChanged(UserStatus::Ready));
            }
        });
        self.push_task(handle);
    }

    /// Raises the inactivity prompt when the session idles with no
    /// summary and at least two messages. Single-shot per arming: after
    /// firing it waits for fresh activity (a send or a dismissal) before
    /// the clock re-arms.
    fn spawn_inactivity_watch(&self) {
        let state = self.state.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        let activity = self.activity.clone();
        let timeout = self.timing.inactivity_timeout;

        let handle = tokio::spawn(async move {
            loop {
                let deadline = lock_state(&state).last_activity + timeout;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = activity.notified() => continue,
                    _ = time::sleep_until(deadline) => {}
                }
                let fired = {
                    let mut guard = lock_state(&state);
                    if guard.summary.is_none()
                        && !guard.inactivity_prompt
                        && guard.session.messages.len() >= 2
                    {
                        guard.inactivity_prompt = true;
                        true
                    } else {
                        false
                    }
                };
                if fired {
                    let _ = events.send(ControllerEvent::InactivityPrompt);
                }
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = activity.notified() => {}
                }
            }
        });
        self.push_task(handle);
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn lock_state(state: &Mutex<ChatState>) -> MutexGuard<'_, ChatState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_status(
    state: &Mutex<ChatState>,
    events: &UnboundedSender<ControllerEvent>,
    status: UserStatus,
) {
    let changed = {
        let mut guard = lock_state(state);
        let changed = guard.status != status;
        guard.status = status;
        changed
    };
    if changed {
        let _ = events.send(ControllerEvent::StatusChanged(status));
    }
}

/// Apply a status response: readiness, cached display name, wallet
fn apply_status(
    state: &Mutex<ChatState>,
    events: &UnboundedSender<ControllerEvent>,
    store: &SessionStore,
    response: UserStatusResponse,
) -> UserStatus {
    let status = UserStatus::from_wire(&response.status);

    if let Some(name) = response.user_profile.and_then(|p| p.name) {
        if let Err(e) = store.set_user_name(&name) {
            warn!("Could not cache display name: {}", e);
        }
    }

    let balance_update = {
        let mut guard = lock_state(state);
        guard.status = status;
        if let Some(balance) = response.wallet_balance {
            guard.wallet_balance = Some(balance);
            Some(balance)
        } else {
            None
        }
    };
    if let Some(balance) = balance_update {
        let _ = events.send(ControllerEvent::WalletUpdated(balance));
    }
    let _ = events.send(ControllerEvent::StatusChanged(status));
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::{Role, ERROR_REPLY};
    use crate::error::ApiError;
    use crate::gateway::types::{
        ChatResponse, EndChatResponse, HistoryResponse, HistorySession,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn api_error(message: &str) -> ApiError {
        ApiError::Status {
            status: 500,
            message: message.to_string(),
        }
    }

    /// In-memory backend for controller tests
    #[derive(Default)]
    struct MockBackend {
        chat_fails: bool,
        chat_delay: Option<Duration>,
        chat_response: Option<ChatResponse>,
        end_fails: bool,
        history: Option<HistoryResponse>,
        statuses: Mutex<VecDeque<String>>,
        status_hangs_when_empty: bool,
        chat_calls: AtomicUsize,
        end_calls: AtomicUsize,
        feedback_calls: AtomicUsize,
        status_calls: AtomicUsize,
    }

    #[async_trait]
    impl Backend for MockBackend {
        async fn send_chat(
            &self,
            _request: ChatRequest,
        ) -> std::result::Result<ChatResponse, ApiError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.chat_delay {
                time::sleep(delay).await;
            }
            if self.chat_fails {
                return Err(api_error("chat unavailable"));
            }
            Ok(self.chat_response.clone().unwrap_or(ChatResponse {
                answer: "The stars are aligned.".to_string(),
                assistant: Some("guruji".to_string()),
                ..Default::default()
            }))
        }

        async fn end_chat(
            &self,
            _request: EndChatRequest,
        ) -> std::result::Result<EndChatResponse, ApiError> {
            self.end_calls.fetch_add(1, Ordering::SeqCst);
            if self.end_fails {
                return Err(api_error("summarize unavailable"));
            }
            Ok(EndChatResponse {
                summary: "A calm and fruitful consultation.".to_string(),
            })
        }

        async fn chat_history(
            &self,
            _mobile: &str,
        ) -> std::result::Result<HistoryResponse, ApiError> {
            Ok(self.history.clone().unwrap_or_default())
        }

        async fn user_status(
            &self,
            _mobile: &str,
        ) -> std::result::Result<UserStatusResponse, ApiError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut statuses = self.statuses.lock().unwrap();
                statuses.pop_front()
            };
            match next {
                Some(status) => Ok(UserStatusResponse {
                    status,
                    user_profile: None,
                    wallet_balance: None,
                }),
                None if self.status_hangs_when_empty => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                None => Ok(UserStatusResponse {
                    status: "ready".to_string(),
                    user_profile: None,
                    wallet_balance: None,
                }),
            }
        }

        async fn submit_feedback(
            &self,
            _request: FeedbackRequest,
        ) -> std::result::Result<(), ApiError> {
            self.feedback_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        controller: Arc<ChatController>,
        backend: Arc<MockBackend>,
        events: UnboundedReceiver<ControllerEvent>,
        _dir: TempDir,
    }

    fn fixture(backend: MockBackend) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store =
            Arc::new(SessionStore::open_with_path(dir.path().join("session.json")).unwrap());
        store.set_mobile("9876543210").unwrap();
        store.set_token("tok_test").unwrap();

        let backend = Arc::new(backend);
        let timing = ChatTiming {
            status_poll_interval: Duration::from_millis(30),
            status_fallback: Duration::from_millis(100),
            inactivity_timeout: Duration::from_secs(600),
        };
        let backend_dyn: Arc<dyn Backend> = backend.clone();
        let (controller, events) = ChatController::new(backend_dyn, store, timing);
        Fixture {
            controller: Arc::new(controller),
            backend,
            events,
            _dir: dir,
        }
    }

    fn make_ready(fixture: &Fixture) {
        fixture.controller.lock().status = UserStatus::Ready;
    }

    #[tokio::test]
    async fn test_send_success_appends_two_messages() {
        let fx = fixture(MockBackend::default());
        make_ready(&fx);
        let before = fx.controller.messages().len();

        let outcome = fx.controller.send("Will I travel this year?").await.unwrap();

        assert_eq!(outcome, SendOutcome::Delivered);
        let messages = fx.controller.messages();
        assert_eq!(messages.len(), before + 2);
        assert_eq!(messages[before].role, Role::User);
        assert_eq!(messages[before + 1].role, Role::Assistant);
        assert!(messages[before + 1].is_animating);
        assert!(!fx.controller.is_sending());
    }

    #[tokio::test]
    async fn test_send_failure_appends_error_reply() {
        let fx = fixture(MockBackend {
            chat_fails: true,
            ..Default::default()
        });
        make_ready(&fx);
        let before = fx.controller.messages().len();

        let outcome = fx.controller.send("hello?").await.unwrap();

        assert_eq!(outcome, SendOutcome::Failed);
        let messages = fx.controller.messages();
        // The log still grows by two: the user turn plus the fallback reply.
        assert_eq!(messages.len(), before + 2);
        assert_eq!(messages.last().unwrap().content, ERROR_REPLY);
        assert!(!fx.controller.is_sending());
    }

    #[tokio::test]
    async fn test_blank_send_is_dropped_without_network() {
        let fx = fixture(MockBackend::default());
        make_ready(&fx);

        let outcome = fx.controller.send("   ").await.unwrap();

        assert_eq!(outcome, SendOutcome::Dropped);
        assert_eq!(fx.backend.chat_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.controller.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_send_gated_until_ready() {
        let fx = fixture(MockBackend::default());
        // Status stays at the initial Checking
        let outcome = fx.controller.send("hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Dropped);
        assert_eq!(fx.backend.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_send_while_outstanding_is_dropped() {
        let fx = fixture(MockBackend::default());
        make_ready(&fx);
        fx.controller.lock().sending = true;

        let outcome = fx.controller.send("am I queued?").await.unwrap();

        assert_eq!(outcome, SendOutcome::Dropped);
        assert_eq!(fx.backend.chat_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.controller.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_send_updates_wallet_and_emits_event() {
        let fx = fixture(MockBackend {
            chat_response: Some(ChatResponse {
                answer: "Jupiter smiles.".to_string(),
                wallet_balance: Some(95.0),
                amount: Some(5.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        make_ready(&fx);
        let mut events = fx.events;

        fx.controller.send("premium question").await.unwrap();

        assert_eq!(fx.controller.wallet_balance(), Some(95.0));
        assert_eq!(
            fx.controller.last_message().unwrap().charge_amount,
            Some(5.0)
        );
        assert_eq!(
            events.try_recv().unwrap(),
            ControllerEvent::WalletUpdated(95.0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_during_send_leaves_state_untouched() {
        let fx = fixture(MockBackend {
            chat_delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        make_ready(&fx);

        let controller = fx.controller.clone();
        let send_task =
            tokio::spawn(async move { controller.send("a slow question").await.unwrap() });
        // Let the send reach its backend await, then tear down mid-flight.
        tokio::time::sleep(Duration::from_millis(10)).await;
        fx.controller.shutdown().await;

        let outcome = send_task.await.unwrap();
        assert_eq!(outcome, SendOutcome::Dropped);

        // The optimistic user message stands; nothing was applied after
        // teardown — no assistant reply, and the in-flight flag was not
        // even cleared.
        let messages = fx.controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
        assert!(fx.controller.is_sending());
    }

    #[tokio::test]
    async fn test_end_rejected_on_empty_log() {
        let fx = fixture(MockBackend::default());
        fx.controller.lock().session.messages.clear();

        let result = fx.controller.end(false).await;

        assert!(result.is_err());
        assert_eq!(fx.backend.end_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_end_sets_summary() {
        let fx = fixture(MockBackend::default());
        make_ready(&fx);
        fx.controller.send("one question").await.unwrap();

        let summary = fx.controller.end(false).await.unwrap();

        assert!(summary.text.contains("consultation"));
        assert!(fx.controller.summary().is_some());
    }

    #[tokio::test]
    async fn test_end_failure_leaves_session_open() {
        let fx = fixture(MockBackend {
            end_fails: true,
            ..Default::default()
        });
        make_ready(&fx);
        fx.controller.send("one question").await.unwrap();

        let result = fx.controller.end(false).await;

        assert!(result.is_err());
        assert!(fx.controller.summary().is_none());
        // The log is intact and the session may continue.
        assert_eq!(fx.controller.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_feedback_zero_rating_never_hits_network() {
        let fx = fixture(MockBackend::default());

        let result = fx.controller.submit_feedback(0, "meh").await;

        assert!(result.is_err());
        assert_eq!(fx.backend.feedback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_feedback_rating_out_of_range_rejected() {
        let fx = fixture(MockBackend::default());
        let result = fx.controller.submit_feedback(6, "").await;
        assert!(result.is_err());
        assert_eq!(fx.backend.feedback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feedback_success_fires_best_effort_end() {
        let fx = fixture(MockBackend::default());

        fx.controller.submit_feedback(5, "wonderful").await.unwrap();

        assert!(fx.controller.feedback().submitted);
        assert_eq!(fx.backend.feedback_calls.load(Ordering::SeqCst), 1);

        // Give the fire-and-forget task a chance to run, then join it.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fx.backend.end_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_feedback_resubmission_rejected() {
        let fx = fixture(MockBackend::default());

        fx.controller.submit_feedback(4, "nice").await.unwrap();
        let second = fx.controller.submit_feedback(5, "again").await;

        assert!(second.is_err());
        assert_eq!(fx.backend.feedback_calls.load(Ordering::SeqCst), 1);
        fx.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_resume_adopts_server_session_wholesale() {
        let server_messages = vec![
            Message::greeting(),
            Message::user("What does my chart say?"),
            Message::assistant("Much promise.", crate::chat::message::AssistantKind::Advisor),
            Message::user("Tell me more."),
        ];
        let fx = fixture(MockBackend {
            history: Some(HistoryResponse {
                sessions: vec![HistorySession {
                    session_id: "SESS_SERVER_42".to_string(),
                    messages: server_messages,
                }],
            }),
            ..Default::default()
        });

        fx.controller.start(false).await;

        assert_eq!(fx.controller.session_id(), "SESS_SERVER_42");
        let messages = fx.controller.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3].content, "Tell me more.");
        fx.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_resume_skipped_when_log_touched() {
        let fx = fixture(MockBackend {
            history: Some(HistoryResponse {
                sessions: vec![HistorySession {
                    session_id: "SESS_SERVER_42".to_string(),
                    messages: vec![Message::greeting()],
                }],
            }),
            ..Default::default()
        });
        // Simulate a log past its initial state
        {
            let mut state = fx.controller.lock();
            state.session.messages.push(Message::user("one"));
            state
                .session
                .messages
                .push(Message::assistant("two", crate::chat::message::AssistantKind::Advisor));
        }
        let local_id = fx.controller.session_id();

        fx.controller.start(false).await;

        assert_eq!(fx.controller.session_id(), local_id);
        assert_eq!(fx.controller.messages().len(), 3);
        fx.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_new_session_intent_skips_history() {
        let fx = fixture(MockBackend {
            history: Some(HistoryResponse {
                sessions: vec![HistorySession {
                    session_id: "SESS_SERVER_42".to_string(),
                    messages: vec![Message::greeting(), Message::user("old")],
                }],
            }),
            ..Default::default()
        });

        fx.controller.start(true).await;

        assert_ne!(fx.controller.session_id(), "SESS_SERVER_42");
        assert_eq!(fx.controller.messages().len(), 1);
        fx.controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_after_ready() {
        let backend = MockBackend {
            statuses: Mutex::new(VecDeque::from([
                "processing".to_string(),
                "processing".to_string(),
                "ready".to_string(),
            ])),
            ..Default::default()
        };
        let fx = fixture(backend);

        fx.controller.start(true).await;
        // Initial check plus two polls at the 30ms interval settle the
        // status; plenty of extra time proves no further calls follow.
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(fx.controller.status(), UserStatus::Ready);
        assert_eq!(fx.backend.status_calls.load(Ordering::SeqCst), 3);
        fx.controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_after_failed() {
        let backend = MockBackend {
            statuses: Mutex::new(VecDeque::from([
                "processing".to_string(),
                "failed".to_string(),
            ])),
            ..Default::default()
        };
        let fx = fixture(backend);

        fx.controller.start(true).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(fx.controller.status(), UserStatus::Failed);
        assert_eq!(fx.backend.status_calls.load(Ordering::SeqCst), 2);
        fx.controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_forces_ready_when_status_hangs() {
        let backend = MockBackend {
            status_hangs_when_empty: true,
            ..Default::default()
        };
        let fx = fixture(backend);

        fx.controller.start(true).await;
        assert_eq!(fx.controller.status(), UserStatus::Checking);

        // Past the 100ms fallback the controller unblocks itself.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fx.controller.status(), UserStatus::Ready);
        fx.controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactivity_prompt_fires_once_and_clears_on_dismiss() {
        let backend = MockBackend {
            statuses: Mutex::new(VecDeque::from(["ready".to_string()])),
            ..Default::default()
        };
        let mut fx = fixture(backend);
        fx.controller.start(true).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Two messages in the log make the session eligible.
        fx.controller.send("are you there?").await.unwrap();

        tokio::time::sleep(Duration::from_secs(601)).await;
        assert!(fx.controller.inactivity_prompt_active());
        let saw_prompt = std::iter::from_fn(|| fx.events.try_recv().ok())
            .any(|e| e == ControllerEvent::InactivityPrompt);
        assert!(saw_prompt);

        fx.controller.dismiss_inactivity_prompt();
        assert!(!fx.controller.inactivity_prompt_active());
        fx.controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactivity_prompt_not_raised_for_untouched_log() {
        let backend = MockBackend {
            statuses: Mutex::new(VecDeque::from(["ready".to_string()])),
            ..Default::default()
        };
        let fx = fixture(backend);
        fx.controller.start(true).await;

        tokio::time::sleep(Duration::from_secs(601)).await;

        // Only the greeting exists; the prompt stays down.
        assert!(!fx.controller.inactivity_prompt_active());
        fx.controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_new_session_resets_everything_but_identity() {
        let fx = fixture(MockBackend::default());
        make_ready(&fx);
        fx.controller.send("a question").await.unwrap();
        fx.controller.end(false).await.unwrap();
        let old_id = fx.controller.session_id();

        fx.controller.new_session();

        assert_ne!(fx.controller.session_id(), old_id);
        assert_eq!(fx.controller.messages().len(), 1);
        assert!(fx.controller.summary().is_none());
        assert!(!fx.controller.feedback().submitted);
    }

    #[tokio::test]
    async fn test_dismiss_summary_keeps_session_open() {
        let fx = fixture(MockBackend::default());
        make_ready(&fx);
        fx.controller.send("a question").await.unwrap();
        fx.controller.end(false).await.unwrap();
        assert!(fx.controller.summary().is_some());

        fx.controller.dismiss_summary();

        assert!(fx.controller.summary().is_none());
        assert_eq!(fx.controller.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_clear_animation() {
        let fx = fixture(MockBackend::default());
        make_ready(&fx);
        fx.controller.send("a question").await.unwrap();
        assert!(fx.controller.last_message().unwrap().is_animating);

        fx.controller.clear_animation();

        assert!(!fx.controller.last_message().unwrap().is_animating);
    }
}
