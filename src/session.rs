use crate::capture::AudioCapture;
use crate::client::{Client, JobBackend, JobPayload};
use crate::error::{PollError, SessionError};
use crate::interpreter::{self, TurnResult};
use crate::playback::{AudioSink, NullSink, PlaybackController};
use crate::poller::{BackoffPolicy, Poller};
use crate::types::{JobId, JobKind, Message};
use crate::utils::audio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

pub const MICROPHONE_ERROR_TEXT: &str =
    "Error accessing microphone. Please ensure microphone permissions are enabled.";
pub const PLAYBACK_ERROR_TEXT: &str = "Sorry, the audio reply could not be played.";

/// The request a session is waiting on.
#[derive(Debug)]
struct PendingRequest {
    generation: u64,
    kind: JobKind,
    job_id: Option<JobId>,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct SessionState {
    is_open: bool,
    messages: Vec<Message>,
    pending: Option<PendingRequest>,
    is_recording: bool,
    // Bumped on every close so replies to abandoned requests can be recognised.
    generation: u64,
}

struct Inner<B: ?Sized> {
    backend: Arc<B>,
    poller: Poller<B>,
    playback: PlaybackController,
    capture: Option<Mutex<Box<dyn AudioCapture>>>,
    greeting: String,
    state: Mutex<SessionState>,
}

/// One chat window's conversation.
///
/// Cheap to clone; clones share the same conversation, so `close` can be
/// called while another clone is awaiting a turn. At most one request is in
/// flight at a time, and every accepted submission ends in an appended
/// message.
pub struct ConversationSession<B: ?Sized> {
    inner: Arc<Inner<B>>,
}

impl<B: ?Sized> Clone for ConversationSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct SessionBuilder<B: ?Sized> {
    backend: Arc<B>,
    policy: BackoffPolicy,
    sink: Arc<dyn AudioSink>,
    capture: Option<Box<dyn AudioCapture>>,
    greeting: String,
}

impl<B: JobBackend + ?Sized> SessionBuilder<B> {
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_capture(mut self, capture: Box<dyn AudioCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_greeting(mut self, greeting: &str) -> Self {
        self.greeting = greeting.to_string();
        self
    }

    pub fn build(self) -> ConversationSession<B> {
        ConversationSession {
            inner: Arc::new(Inner {
                poller: Poller::new(self.backend.clone(), self.policy),
                backend: self.backend,
                playback: PlaybackController::new(self.sink),
                capture: self.capture.map(Mutex::new),
                greeting: self.greeting,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }
}

impl ConversationSession<Client> {
    /// Session using the client's configured poll policy and greeting.
    pub fn for_client(client: Arc<Client>) -> SessionBuilder<Client> {
        let policy = client.config().poll_policy();
        let greeting = client.config().greeting().to_string();
        ConversationSession::builder(client)
            .with_policy(policy)
            .with_greeting(&greeting)
    }
}

impl<B: JobBackend + ?Sized> ConversationSession<B> {
    pub fn builder(backend: Arc<B>) -> SessionBuilder<B> {
        SessionBuilder {
            backend,
            policy: BackoffPolicy::default(),
            sink: Arc::new(NullSink),
            capture: None,
            greeting: crate::client::consts::DEFAULT_GREETING.to_string(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the window and greets the user. Does nothing if already open.
    pub fn open(&self) {
        let mut state = self.state();
        if state.is_open {
            return;
        }
        state.is_open = true;
        state.messages = vec![Message::assistant(&self.inner.greeting)];
        tracing::debug!("session opened");
    }

    /// Abandons any in-flight request, stops audio and clears the history.
    pub fn close(&self) {
        let mut state = self.state();
        if let Some(pending) = state.pending.take() {
            tracing::info!("abandoning pending {:?} request {:?}", pending.kind, pending.job_id);
            pending.cancel.cancel();
        }
        let was_recording = std::mem::take(&mut state.is_recording);
        state.generation += 1;
        state.messages.clear();
        state.is_open = false;
        drop(state);

        // Outside the state lock.
        if was_recording {
            if let Some(capture) = &self.inner.capture {
                capture.lock().unwrap_or_else(PoisonError::into_inner).cancel();
            }
        }
        self.inner.playback.stop_all();
        tracing::debug!("session closed");
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open
    }

    pub fn is_busy(&self) -> bool {
        self.state().pending.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_recording
    }

    /// Id of the in-flight job, once the backend has assigned one.
    pub fn pending_job(&self) -> Option<JobId> {
        self.state().pending.as_ref().and_then(|p| p.job_id.clone())
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.inner.playback
    }

    /// Sends a typed message and waits for the reply.
    pub async fn submit_user_text(&self, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let (generation, cancel) = self.begin(JobKind::Text, Some(Message::user(text)))?;
        let result = self
            .run_turn(JobPayload::Text(text.to_string()), generation, &cancel)
            .await;
        self.finish(generation, result);
        Ok(())
    }

    /// Sends a recorded clip and waits for the reply. The user's words only
    /// enter the history once the backend sends back a transcription.
    pub async fn submit_user_audio(&self, clip: &[u8]) -> Result<(), SessionError> {
        if clip.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let (generation, cancel) = self.begin(JobKind::Audio, None)?;
        let payload = JobPayload::Audio(audio::encode(clip));
        let result = self.run_turn(payload, generation, &cancel).await;
        self.finish(generation, result);
        Ok(())
    }

    /// Like [`submit_user_audio`](Self::submit_user_audio) for a browser-style
    /// `data:audio/wav;base64,` or `data:audio/webm;base64,` URL.
    pub async fn submit_user_audio_data_url(&self, url: &str) -> Result<(), SessionError> {
        if url.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let (generation, cancel) = self.begin(JobKind::Audio, None)?;
        let result = match audio::encode_data_url(url) {
            Ok(transport) => {
                self.run_turn(JobPayload::Audio(transport), generation, &cancel)
                    .await
            }
            Err(e) => {
                tracing::warn!("rejecting recorded clip: {}", e);
                Some(TurnResult::Error(interpreter::AUDIO_ERROR_TEXT.to_string()))
            }
        };
        self.finish(generation, result);
        Ok(())
    }

    /// Starts the microphone. A failure is reported in the history and leaves
    /// the session not recording.
    pub fn start_recording(&self) -> Result<(), SessionError> {
        let mut state = self.state();
        if !state.is_open {
            return Err(SessionError::NotOpen);
        }
        if state.is_recording {
            return Ok(());
        }
        let started = match &self.inner.capture {
            Some(capture) => capture
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .start(),
            None => Err(crate::capture::CaptureError::Unavailable(
                "no capture device configured".to_string(),
            )),
        };
        match started {
            Ok(()) => {
                state.is_recording = true;
                tracing::debug!("recording started");
            }
            Err(e) => {
                tracing::warn!("error accessing microphone: {}", e);
                state.messages.push(Message::error(MICROPHONE_ERROR_TEXT));
            }
        }
        Ok(())
    }

    /// Stops the microphone and submits what was recorded as a voice turn.
    pub async fn stop_recording(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state();
            if !state.is_recording {
                return Ok(());
            }
            state.is_recording = false;
        }
        let Some(capture) = &self.inner.capture else {
            return Ok(());
        };
        let stopped = capture.lock().unwrap_or_else(PoisonError::into_inner).stop();
        let clip = match stopped {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!("recording failed: {}", e);
                self.state()
                    .messages
                    .push(Message::error(interpreter::AUDIO_ERROR_TEXT));
                return Ok(());
            }
        };
        self.submit_user_audio(&clip).await
    }

    fn begin(
        &self,
        kind: JobKind,
        user_message: Option<Message>,
    ) -> Result<(u64, CancellationToken), SessionError> {
        let mut state = self.state();
        if !state.is_open {
            return Err(SessionError::NotOpen);
        }
        if state.pending.is_some() {
            return Err(SessionError::Busy);
        }
        if let Some(message) = user_message {
            state.messages.push(message);
        }
        let cancel = CancellationToken::new();
        let generation = state.generation;
        state.pending = Some(PendingRequest {
            generation,
            kind,
            job_id: None,
            cancel: cancel.clone(),
        });
        Ok((generation, cancel))
    }

    /// Drives one job to a terminal outcome. `None` means the session was
    /// closed while waiting.
    async fn run_turn(
        &self,
        payload: JobPayload,
        generation: u64,
        cancel: &CancellationToken,
    ) -> Option<TurnResult> {
        let kind = payload.kind();
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            submitted = self.inner.backend.submit(payload) => submitted,
        };
        let handle = match submitted {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("job submission failed: {}", e);
                return Some(interpreter::interpret_error(kind, &e));
            }
        };

        {
            let mut state = self.state();
            match state.pending.as_mut() {
                Some(pending) if pending.generation == generation => {
                    pending.job_id = Some(handle.id().clone());
                }
                _ => return None,
            }
        }

        let mut job = handle.into_job();
        match self.inner.poller.poll(&mut job, cancel).await {
            Ok(outcome) => Some(interpreter::interpret(kind, &outcome)),
            Err(PollError::Cancelled) => None,
            Err(PollError::Backend(e)) => Some(interpreter::interpret_error(kind, &e)),
        }
    }

    fn finish(&self, generation: u64, result: Option<TurnResult>) {
        let mut state = self.state();
        let current = state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation);
        if state.generation != generation || !current {
            tracing::debug!("discarding reply for a closed session");
            return;
        }
        state.pending = None;

        let Some(result) = result else {
            return;
        };
        let audio = match &result {
            TurnResult::Reply { audio, .. } => audio.clone(),
            TurnResult::Error(_) => None,
        };
        state.messages.extend(result.into_messages());
        drop(state);

        let Some(audio) = audio else {
            return;
        };
        let played = self.inner.playback.play(&audio);
        let mut state = self.state();
        if state.generation != generation {
            // Closed while the clip was starting.
            drop(state);
            self.inner.playback.stop_all();
            return;
        }
        if let Err(e) = played {
            tracing::warn!("audio playback failed: {}", e);
            state.messages.push(Message::error(PLAYBACK_ERROR_TEXT));
        }
    }
}
