//! Session controller.
//!
//! Owns the transcript, the selected model, the draft, and the file-picker
//! selection, and runs the `Idle | Busy{kind}` state machine around the two
//! gateway calls. Methods take `&self`: state sits behind a mutex that is never
//! held across an `.await`, so intents such as `select_model` interleave with
//! an in-flight request the way UI events interleave in an event loop.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;

use crate::client::{GatewayError, RagGateway};
use crate::error_taxonomy::ErrorEnvelope;
use crate::models::{Document, Message, ModelCatalog, ModelId, UploadAck};
use crate::transcript::Transcript;
use crate::utils::display_file_name;

// === Types ===

/// Which outbound request holds the session busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Chatting,
    Uploading,
}

/// Controller state. At most one request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Busy(RequestKind),
}

/// Input rejected before anything is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no file selected")]
    MissingFile,
}

/// Result of a submit intent, reported back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The request resolved successfully.
    Completed,
    /// The request was dispatched and failed; a notification was emitted.
    Failed(GatewayError),
    /// Another request was in flight; nothing changed.
    Ignored,
    /// The input was rejected before dispatch; nothing changed.
    Rejected(ValidationFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A toast for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
    /// Failure cause, for error notifications.
    pub cause: Option<String>,
}

impl Notification {
    fn success(description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: "Success".to_string(),
            description: description.into(),
            cause: None,
        }
    }

    fn failure(context: &str, err: &GatewayError) -> Self {
        let cause = err.to_string();
        Self {
            level: NotificationLevel::Error,
            title: "Error".to_string(),
            description: format!("{context}: {cause}"),
            cause: Some(cause),
        }
    }
}

/// Construction options for a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub catalog: ModelCatalog,
    /// Assistant message that opens the transcript.
    pub greeting: Option<String>,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    model: ModelId,
    draft: String,
    file_input: Option<PathBuf>,
    transcript: Transcript,
    notifications: VecDeque<Notification>,
    last_request: u64,
}

impl Inner {
    fn try_begin(&mut self, kind: RequestKind) -> Option<u64> {
        match self.state {
            SessionState::Busy(active) => {
                tracing::debug!(?active, requested = ?kind, "session busy, dropping request");
                None
            }
            SessionState::Idle => {
                self.state = SessionState::Busy(kind);
                self.last_request += 1;
                tracing::debug!(?kind, request = self.last_request, "session busy");
                Some(self.last_request)
            }
        }
    }
}

#[derive(Clone, Copy)]
enum ChatSource<'a> {
    Text(&'a str),
    Draft,
}

enum UploadSource {
    Picker,
    Document(Option<Document>),
}

enum PendingDocument {
    Path(PathBuf),
    Loaded(Document),
}

struct ChatDispatch<'a> {
    _busy: BusyGuard<'a>,
    request: u64,
    transcript: Vec<Message>,
    model: ModelId,
}

struct UploadDispatch<'a> {
    _busy: BusyGuard<'a>,
    request: u64,
    document: PendingDocument,
}

/// Returns the session to `Idle` when the request ends, however it ends.
struct BusyGuard<'a> {
    session: &'a Session,
    kind: RequestKind,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        inner.state = SessionState::Idle;
        if self.kind == RequestKind::Uploading {
            inner.file_input = None;
        }
        tracing::debug!(kind = ?self.kind, "session idle");
    }
}

// === Session ===

/// One conversation with the RAG service.
pub struct Session {
    gateway: Arc<dyn RagGateway>,
    catalog: ModelCatalog,
    inner: Mutex<Inner>,
}

impl Session {
    #[must_use]
    pub fn new(gateway: Arc<dyn RagGateway>, settings: SessionSettings) -> Self {
        let SessionSettings { catalog, greeting } = settings;
        let mut transcript = Transcript::new();
        if let Some(greeting) = greeting.filter(|text| !text.trim().is_empty()) {
            transcript.append(Message::assistant(greeting));
        }
        let inner = Inner {
            state: SessionState::Idle,
            model: catalog.default_model(),
            draft: String::new(),
            file_input: None,
            transcript,
            notifications: VecDeque::new(),
            last_request: 0,
        };
        Self {
            gateway,
            catalog,
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Read-side accessors ---

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    #[must_use]
    #[allow(dead_code)]
    pub fn is_busy(&self) -> bool {
        self.state() != SessionState::Idle
    }

    #[must_use]
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn model(&self) -> ModelId {
        self.lock().model.clone()
    }

    #[must_use]
    #[allow(dead_code)]
    pub fn draft(&self) -> String {
        self.lock().draft.clone()
    }

    #[must_use]
    #[allow(dead_code)]
    pub fn file_input(&self) -> Option<PathBuf> {
        self.lock().file_input.clone()
    }

    /// Copy of the transcript for rendering.
    #[must_use]
    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.snapshot().to_vec()
    }

    /// Receiver notified after every transcript append.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.lock().transcript.subscribe()
    }

    /// Drain pending notifications in emission order.
    pub fn take_notifications(&self) -> Vec<Notification> {
        self.lock().notifications.drain(..).collect()
    }

    // --- Intents ---

    /// Switch the model used by subsequent requests. In-flight requests keep
    /// the model captured when they were dispatched.
    pub fn select_model(&self, model: ModelId) {
        debug_assert!(
            self.catalog.contains(&model),
            "model {model} is not in the catalog"
        );
        tracing::debug!(%model, "model selected");
        self.lock().model = model;
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.lock().draft = text.into();
    }

    /// Record a file-picker selection. Refused while a request is in flight.
    pub fn pick_file(&self, path: impl Into<PathBuf>) -> bool {
        let mut inner = self.lock();
        if inner.state != SessionState::Idle {
            return false;
        }
        inner.file_input = Some(path.into());
        true
    }

    /// Send `text` as the next user turn.
    pub async fn submit_message(&self, text: &str) -> Submission {
        match self.begin_chat(ChatSource::Text(text)) {
            Ok(dispatch) => self.run_chat(dispatch).await,
            Err(outcome) => outcome,
        }
    }

    /// Send the current draft; the draft is cleared once the turn is accepted.
    pub async fn submit_draft(&self) -> Submission {
        match self.begin_chat(ChatSource::Draft) {
            Ok(dispatch) => self.run_chat(dispatch).await,
            Err(outcome) => outcome,
        }
    }

    /// Upload the file currently held by the file picker.
    pub async fn submit_file(&self) -> Submission {
        match self.begin_upload(UploadSource::Picker) {
            Ok(dispatch) => self.run_upload(dispatch).await,
            Err(outcome) => outcome,
        }
    }

    /// Upload an already-loaded document.
    pub async fn submit_document(&self, document: Option<Document>) -> Submission {
        match self.begin_upload(UploadSource::Document(document)) {
            Ok(dispatch) => self.run_upload(dispatch).await,
            Err(outcome) => outcome,
        }
    }

    // --- Transitions ---

    fn begin_chat(&self, source: ChatSource<'_>) -> Result<ChatDispatch<'_>, Submission> {
        let mut inner = self.lock();
        let text = match source {
            ChatSource::Text(text) => text.to_string(),
            ChatSource::Draft => inner.draft.clone(),
        };
        if text.trim().is_empty() {
            return Err(reject(ValidationFailure::EmptyMessage));
        }
        let request = inner
            .try_begin(RequestKind::Chatting)
            .ok_or(Submission::Ignored)?;
        if matches!(source, ChatSource::Draft) {
            inner.draft.clear();
        }
        inner.transcript.append(Message::user(text));
        tracing::debug!(request, turns = inner.transcript.len(), "user turn appended");

        Ok(ChatDispatch {
            _busy: BusyGuard {
                session: self,
                kind: RequestKind::Chatting,
            },
            request,
            transcript: inner.transcript.snapshot().to_vec(),
            model: inner.model.clone(),
        })
    }

    async fn run_chat(&self, dispatch: ChatDispatch<'_>) -> Submission {
        let ChatDispatch {
            _busy,
            request,
            transcript,
            model,
        } = dispatch;
        tracing::info!(request, %model, turns = transcript.len(), "dispatching chat turn");

        let outcome = self.gateway.send_chat_turn(&transcript, &model).await;

        let mut inner = self.lock();
        match outcome {
            Ok(reply) => {
                tracing::info!(request, chars = reply.len(), "chat reply received");
                inner.transcript.append(Message::assistant(reply));
                Submission::Completed
            }
            Err(err) => {
                ErrorEnvelope::from(&err).log("chat");
                inner
                    .notifications
                    .push_back(Notification::failure("Failed to send message", &err));
                Submission::Failed(err)
            }
        }
        // `inner` is released before `_busy` drops and re-locks.
    }

    fn begin_upload(&self, source: UploadSource) -> Result<UploadDispatch<'_>, Submission> {
        let mut inner = self.lock();
        let document = match source {
            UploadSource::Picker => inner.file_input.clone().map(PendingDocument::Path),
            UploadSource::Document(document) => document.map(PendingDocument::Loaded),
        };
        let document = document.ok_or_else(|| reject(ValidationFailure::MissingFile))?;
        let request = inner
            .try_begin(RequestKind::Uploading)
            .ok_or(Submission::Ignored)?;

        Ok(UploadDispatch {
            _busy: BusyGuard {
                session: self,
                kind: RequestKind::Uploading,
            },
            request,
            document,
        })
    }

    async fn run_upload(&self, dispatch: UploadDispatch<'_>) -> Submission {
        let UploadDispatch {
            _busy,
            request,
            document,
        } = dispatch;

        let loaded = match document {
            PendingDocument::Path(path) => load_document(&path).await,
            PendingDocument::Loaded(document) => Ok(document),
        };
        let outcome: Result<UploadAck, GatewayError> = match loaded {
            Ok(document) => {
                tracing::info!(request, file = %document.file_name, "dispatching document upload");
                self.gateway.upload_document(document).await
            }
            Err(err) => Err(err),
        };

        let mut inner = self.lock();
        match outcome {
            Ok(ack) => {
                tracing::info!(request, ack = %ack.message, "document uploaded");
                inner.notifications.push_back(Notification::success(ack.message));
                Submission::Completed
            }
            Err(err) => {
                ErrorEnvelope::from(&err).log("upload");
                inner
                    .notifications
                    .push_back(Notification::failure("Failed to upload document", &err));
                Submission::Failed(err)
            }
        }
    }
}

fn reject(failure: ValidationFailure) -> Submission {
    ErrorEnvelope::from(failure).log("submit");
    Submission::Rejected(failure)
}

async fn load_document(path: &Path) -> Result<Document, GatewayError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| GatewayError::Io(format!("Failed to read {}: {err}", path.display())))?;
    Ok(Document::new(display_file_name(path), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    use crate::models::Role;

    /// In-memory gateway that replays scripted outcomes and records calls.
    #[derive(Default)]
    struct ScriptedGateway {
        chat_replies: Mutex<VecDeque<Result<String, GatewayError>>>,
        upload_replies: Mutex<VecDeque<Result<UploadAck, GatewayError>>>,
        chat_calls: Mutex<Vec<(Vec<Message>, ModelId)>>,
        upload_calls: Mutex<Vec<Document>>,
        gated: bool,
        entered: Notify,
        release: Notify,
    }

    impl ScriptedGateway {
        fn gated() -> Self {
            Self {
                gated: true,
                ..Self::default()
            }
        }

        fn reply(&self, outcome: Result<&str, GatewayError>) {
            self.chat_replies
                .lock()
                .unwrap()
                .push_back(outcome.map(str::to_string));
        }

        fn ack(&self, outcome: Result<&str, GatewayError>) {
            self.upload_replies.lock().unwrap().push_back(outcome.map(|message| UploadAck {
                message: message.to_string(),
            }));
        }

        fn chat_calls(&self) -> Vec<(Vec<Message>, ModelId)> {
            self.chat_calls.lock().unwrap().clone()
        }

        fn upload_calls(&self) -> Vec<Document> {
            self.upload_calls.lock().unwrap().clone()
        }

        async fn hold(&self) {
            self.entered.notify_one();
            if self.gated {
                self.release.notified().await;
            }
        }
    }

    #[async_trait]
    impl RagGateway for ScriptedGateway {
        async fn send_chat_turn(
            &self,
            transcript: &[Message],
            model: &ModelId,
        ) -> Result<String, GatewayError> {
            self.chat_calls
                .lock()
                .unwrap()
                .push((transcript.to_vec(), model.clone()));
            self.hold().await;
            self.chat_replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted chat call")
        }

        async fn upload_document(&self, document: Document) -> Result<UploadAck, GatewayError> {
            self.upload_calls.lock().unwrap().push(document);
            self.hold().await;
            self.upload_replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted upload call")
        }
    }

    fn catalog() -> ModelCatalog {
        ModelCatalog::new(["m1", "m2"], Some("m1")).unwrap()
    }

    fn session_with(gateway: &Arc<ScriptedGateway>) -> Session {
        let settings = SessionSettings {
            catalog: catalog(),
            greeting: None,
        };
        Session::new(gateway.clone(), settings)
    }

    fn model(name: &str) -> ModelId {
        catalog().resolve(name).unwrap()
    }

    #[tokio::test]
    async fn successful_turn_appends_user_then_assistant() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.reply(Ok("hi"));
        let session = session_with(&gateway);

        assert_eq!(session.submit_message("hello").await, Submission::Completed);

        assert_eq!(
            session.transcript(),
            vec![Message::user("hello"), Message::assistant("hi")]
        );
        assert!(!session.is_busy());
        assert!(session.take_notifications().is_empty());

        let calls = gateway.chat_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![Message::user("hello")]);
        assert_eq!(calls[0].1, model("m1"));
    }

    #[tokio::test]
    async fn alternating_turns_stay_interleaved_in_order() {
        let gateway = Arc::new(ScriptedGateway::default());
        let session = session_with(&gateway);

        for turn in 0..5 {
            gateway.reply(Ok(format!("reply {turn}").as_str()));
            let outcome = session.submit_message(&format!("question {turn}")).await;
            assert_eq!(outcome, Submission::Completed);
        }

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 10);
        for (turn, pair) in transcript.chunks(2).enumerate() {
            assert_eq!(pair[0], Message::user(format!("question {turn}")));
            assert_eq!(pair[1], Message::assistant(format!("reply {turn}")));
        }

        // Each call carries the whole conversation so far.
        let calls = gateway.chat_calls();
        assert_eq!(calls[4].0.len(), 9);
        assert_eq!(calls[4].0.last(), Some(&Message::user("question 4")));
    }

    #[tokio::test]
    async fn failed_turn_keeps_user_message_and_notifies() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.reply(Err(GatewayError::Transport("network down".to_string())));
        let session = session_with(&gateway);

        let outcome = session.submit_message("hello").await;
        assert_eq!(
            outcome,
            Submission::Failed(GatewayError::Transport("network down".to_string()))
        );

        assert_eq!(session.transcript(), vec![Message::user("hello")]);
        assert!(!session.is_busy());

        let notifications = session.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert_eq!(notifications[0].cause.as_deref(), Some("network down"));
        assert_eq!(
            notifications[0].description,
            "Failed to send message: network down"
        );

        // The session recovers immediately.
        gateway.reply(Ok("back online"));
        assert_eq!(session.submit_message("retry").await, Submission::Completed);
        assert_eq!(
            session.transcript().last(),
            Some(&Message::assistant("back online"))
        );
    }

    #[tokio::test]
    async fn empty_submission_changes_nothing() {
        let gateway = Arc::new(ScriptedGateway::default());
        let session = session_with(&gateway);

        for text in ["", "   ", "\n\t"] {
            assert_eq!(
                session.submit_message(text).await,
                Submission::Rejected(ValidationFailure::EmptyMessage)
            );
        }
        assert!(session.transcript().is_empty());
        assert!(gateway.chat_calls().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn submissions_while_busy_are_dropped() {
        let gateway = Arc::new(ScriptedGateway::gated());
        gateway.reply(Ok("hi"));
        let session = session_with(&gateway);
        let mut updates = session.subscribe();

        let (first, ()) = tokio::join!(session.submit_message("hello"), async {
            gateway.entered.notified().await;
            assert_eq!(session.state(), SessionState::Busy(RequestKind::Chatting));
            let before = session.transcript();

            assert_eq!(session.submit_message("again").await, Submission::Ignored);
            assert_eq!(
                session.submit_document(Some(Document::new("a.pdf", vec![1]))).await,
                Submission::Ignored
            );
            assert!(!session.pick_file("late.pdf"));

            assert_eq!(session.transcript(), before);
            assert_eq!(session.state(), SessionState::Busy(RequestKind::Chatting));
            assert_eq!(session.file_input(), None);
            gateway.release.notify_one();
        });

        assert_eq!(first, Submission::Completed);
        assert_eq!(gateway.chat_calls().len(), 1);
        assert!(gateway.upload_calls().is_empty());
        assert_eq!(
            session.transcript(),
            vec![Message::user("hello"), Message::assistant("hi")]
        );
        assert!(updates.has_changed().unwrap());
        assert_eq!(*updates.borrow_and_update(), 2);
    }

    #[tokio::test]
    async fn chat_while_uploading_is_dropped() {
        let gateway = Arc::new(ScriptedGateway::gated());
        gateway.ack(Ok("Document uploaded successfully"));
        let session = session_with(&gateway);

        let document = Document::new("report.pdf", b"%PDF".to_vec());
        let (upload, ()) = tokio::join!(session.submit_document(Some(document)), async {
            gateway.entered.notified().await;
            assert_eq!(session.state(), SessionState::Busy(RequestKind::Uploading));

            assert_eq!(session.submit_message("hello").await, Submission::Ignored);
            session.set_draft("queued question");
            assert_eq!(session.submit_draft().await, Submission::Ignored);

            assert!(session.transcript().is_empty());
            assert_eq!(session.draft(), "queued question");
            assert_eq!(session.state(), SessionState::Busy(RequestKind::Uploading));
            gateway.release.notify_one();
        });

        assert_eq!(upload, Submission::Completed);
        assert!(gateway.chat_calls().is_empty());
        assert_eq!(gateway.upload_calls().len(), 1);
        assert!(session.transcript().is_empty());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn default_config_upload_to_bundled_backend_succeeds() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use crate::client::{DEFAULT_UPLOAD_ACK, RagClient};
        use crate::config::Config;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = Config::default()
            .with_overrides(Some(server.uri()), None)
            .unwrap();
        let client = RagClient::new(&config.client_settings()).unwrap();
        let session = Session::new(Arc::new(client), config.session_settings().unwrap());

        let document = Document::new("report.pdf", b"%PDF-1.4 body".to_vec());
        let outcome = session.submit_document(Some(document)).await;
        assert_eq!(outcome, Submission::Completed);
        assert_eq!(
            session.take_notifications(),
            vec![Notification {
                level: NotificationLevel::Success,
                title: "Success".to_string(),
                description: DEFAULT_UPLOAD_ACK.to_string(),
                cause: None,
            }]
        );
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn model_change_mid_flight_does_not_affect_dispatched_turn() {
        let gateway = Arc::new(ScriptedGateway::gated());
        gateway.reply(Ok("first"));
        let session = session_with(&gateway);

        let (outcome, ()) = tokio::join!(session.submit_message("hello"), async {
            gateway.entered.notified().await;
            session.select_model(model("m2"));
            gateway.release.notify_one();
        });
        assert_eq!(outcome, Submission::Completed);
        assert_eq!(gateway.chat_calls()[0].1, model("m1"));
        assert_eq!(session.model(), model("m2"));

        gateway.reply(Ok("second"));
        gateway.release.notify_one();
        assert_eq!(session.submit_message("next").await, Submission::Completed);
        assert_eq!(gateway.chat_calls()[1].1, model("m2"));
    }

    #[tokio::test]
    async fn dropped_request_still_releases_busy() {
        let gateway = Arc::new(ScriptedGateway::gated());
        let session = session_with(&gateway);

        let mut pending = Box::pin(session.submit_message("hello"));
        tokio::select! {
            biased;
            _ = &mut pending => panic!("gated request should not resolve"),
            () = gateway.entered.notified() => {}
        }
        assert!(session.is_busy());
        drop(pending);

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.transcript(), vec![Message::user("hello")]);
    }

    #[tokio::test]
    async fn draft_is_cleared_only_when_accepted() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.reply(Ok("hi"));
        let session = session_with(&gateway);

        session.set_draft("  ");
        assert_eq!(
            session.submit_draft().await,
            Submission::Rejected(ValidationFailure::EmptyMessage)
        );
        assert_eq!(session.draft(), "  ");

        session.set_draft("hello");
        assert_eq!(session.submit_draft().await, Submission::Completed);
        assert_eq!(session.draft(), "");
        assert_eq!(session.transcript()[0], Message::user("hello"));
    }

    #[tokio::test]
    async fn greeting_opens_transcript_and_is_sent_with_turns() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.reply(Ok("sure"));
        let settings = SessionSettings {
            catalog: catalog(),
            greeting: Some("Hello! How can I help you today?".to_string()),
        };
        let session = Session::new(gateway.clone(), settings);

        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].role, Role::Assistant);

        session.submit_message("summarize the report").await;
        assert_eq!(gateway.chat_calls()[0].0.len(), 2);
    }

    #[tokio::test]
    async fn upload_success_notifies_and_clears_picker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();

        let gateway = Arc::new(ScriptedGateway::default());
        gateway.ack(Ok("Document uploaded successfully"));
        let session = session_with(&gateway);

        assert!(session.pick_file(&path));
        assert_eq!(session.submit_file().await, Submission::Completed);

        assert_eq!(
            session.take_notifications(),
            vec![Notification {
                level: NotificationLevel::Success,
                title: "Success".to_string(),
                description: "Document uploaded successfully".to_string(),
                cause: None,
            }]
        );
        assert!(session.transcript().is_empty());
        assert_eq!(session.file_input(), None);
        assert!(!session.is_busy());

        let uploads = gateway.upload_calls();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_name, "report.pdf");
        assert_eq!(uploads[0].bytes, b"%PDF-1.4 body".to_vec());
    }

    #[tokio::test]
    async fn upload_failure_notifies_and_clears_picker() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.ack(Err(GatewayError::Status {
            status: 500,
            detail: "Error processing document".to_string(),
        }));
        let session = session_with(&gateway);

        let outcome = session
            .submit_document(Some(Document::new("report.pdf", vec![0x25])))
            .await;
        assert!(matches!(outcome, Submission::Failed(GatewayError::Status { .. })));

        let notifications = session.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert_eq!(
            notifications[0].description,
            "Failed to upload document: HTTP 500: Error processing document"
        );
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn unreadable_file_fails_without_reaching_gateway() {
        let gateway = Arc::new(ScriptedGateway::default());
        let session = session_with(&gateway);
        let dir = tempfile::tempdir().unwrap();

        assert!(session.pick_file(dir.path().join("missing.pdf")));
        let outcome = session.submit_file().await;
        assert!(matches!(outcome, Submission::Failed(GatewayError::Io(_))));
        assert!(gateway.upload_calls().is_empty());
        assert_eq!(session.file_input(), None);
        assert_eq!(session.take_notifications().len(), 1);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let gateway = Arc::new(ScriptedGateway::default());
        let session = session_with(&gateway);

        assert_eq!(
            session.submit_file().await,
            Submission::Rejected(ValidationFailure::MissingFile)
        );
        assert_eq!(
            session.submit_document(None).await,
            Submission::Rejected(ValidationFailure::MissingFile)
        );
        assert!(gateway.upload_calls().is_empty());
        assert!(session.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn upload_while_chatting_keeps_picker_selection() {
        let gateway = Arc::new(ScriptedGateway::gated());
        gateway.reply(Ok("hi"));
        let session = session_with(&gateway);
        assert!(session.pick_file("queued.pdf"));

        let (outcome, ()) = tokio::join!(session.submit_message("hello"), async {
            gateway.entered.notified().await;
            assert_eq!(session.submit_file().await, Submission::Ignored);
            gateway.release.notify_one();
        });
        assert_eq!(outcome, Submission::Completed);
        assert_eq!(session.file_input(), Some(PathBuf::from("queued.pdf")));
    }
}
