//! Text-to-audio delivery pipeline.
//!
//! One inbound text message in, one voice message (or a per-stage error
//! reply) out. The pipeline validates, synthesizes, resolves remote
//! references, stages the audio on disk and uploads it, keeping the user
//! informed through a status placeholder the whole way.

pub mod outbound;
pub mod staging;

pub use outbound::{OutboundChannel, OutboundError, StatusHandle};
pub use staging::StagedAudio;

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use crate::telegram::escape_html;
use crate::tts::{AudioSource, SynthesisResult, Synthesizer, VoicePreference, VoiceTable};

/// Longest accepted message, in characters.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Status placeholder posted while the pipeline works.
pub const STATUS_PREPARING: &str = "⏳ Preparing your audio...";
/// Rejection reply for whitespace-only text.
pub const REPLY_EMPTY_TEXT: &str = "❌ The message text is empty";
/// Rejection reply for over-length text.
pub const REPLY_TOO_LONG: &str = "❌ The text is too long (1000 characters max)";
/// Status text when synthesis produced nothing usable.
pub const STATUS_SYNTH_FAILED: &str = "❌ Audio generation failed, try again later";
/// Status text when the referenced audio could not be downloaded.
pub const STATUS_FETCH_FAILED: &str = "❌ Could not download the generated audio";
/// Status text when the upload to the chat failed.
pub const STATUS_SEND_FAILED: &str = "❌ Could not send the audio";

/// One text message to turn into audio.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub chat_id: i64,
    pub sender_id: i64,
    /// Id of the triggering message; replies and the staged file name
    /// are keyed on it.
    pub message_id: i64,
    pub text: String,
    pub voice: VoicePreference,
}

/// Terminal state of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Voice message delivered, placeholder removed.
    Delivered,
    /// Rejected before synthesis: nothing but whitespace.
    RejectedEmpty,
    /// Rejected before synthesis: over the character limit.
    RejectedTooLong,
    /// The TTS service failed or answered with something unusable.
    SynthesisFailed,
    /// The service pointed at a hosted file we could not download.
    FetchFailed,
    /// Audio was ready but staging or upload failed.
    SendFailed,
}

/// The per-message pipeline. Cheap to share; all dependencies sit
/// behind `Arc`s.
pub struct DeliveryPipeline {
    synth: Arc<dyn Synthesizer>,
    audio: Arc<dyn AudioSource>,
    outbound: Arc<dyn OutboundChannel>,
    voices: VoiceTable,
    staging_dir: PathBuf,
    bot_handle: String,
}

impl DeliveryPipeline {
    pub fn new(
        synth: Arc<dyn Synthesizer>,
        audio: Arc<dyn AudioSource>,
        outbound: Arc<dyn OutboundChannel>,
        voices: VoiceTable,
        staging_dir: impl Into<PathBuf>,
        bot_handle: impl Into<String>,
    ) -> Self {
        Self {
            synth,
            audio,
            outbound,
            voices,
            staging_dir: staging_dir.into(),
            bot_handle: bot_handle.into(),
        }
    }

    /// Run one message through the pipeline.
    ///
    /// Never returns an error: every failure is reported to the chat and
    /// folded into the returned [`DeliveryOutcome`].
    pub async fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        // The trimmed text is what gets validated, synthesized and captioned.
        let text = request.text.trim();
        if text.is_empty() {
            self.reply(request, REPLY_EMPTY_TEXT).await;
            return DeliveryOutcome::RejectedEmpty;
        }
        if text.chars().count() > MAX_TEXT_CHARS {
            self.reply(request, REPLY_TOO_LONG).await;
            return DeliveryOutcome::RejectedTooLong;
        }

        let status = match self
            .outbound
            .send_status(request.chat_id, request.message_id, STATUS_PREPARING)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    chat_id = request.chat_id,
                    message_id = request.message_id,
                    error = %e,
                    "failed to post status placeholder"
                );
                return DeliveryOutcome::SendFailed;
            }
        };

        let model = self.voices.model_for(request.voice);
        match self.synth.synthesize(model, text).await {
            SynthesisResult::InlineAudio {
                bytes,
                content_type,
            } => {
                tracing::debug!(
                    message_id = request.message_id,
                    content_type = %content_type,
                    bytes = bytes.len(),
                    "synthesis returned inline audio"
                );
                self.stage_and_send(request, text, &bytes, status).await
            }
            SynthesisResult::RemoteAudioRef { url } => match self.audio.fetch(&url).await {
                Ok(bytes) => self.stage_and_send(request, text, &bytes, status).await,
                Err(e) => {
                    tracing::warn!(
                        message_id = request.message_id,
                        url = %url,
                        error = %e,
                        "failed to fetch referenced audio"
                    );
                    self.edit_status(status, STATUS_FETCH_FAILED).await;
                    DeliveryOutcome::FetchFailed
                }
            },
            SynthesisResult::Unrecognized { body_prefix } => {
                tracing::error!(
                    message_id = request.message_id,
                    body_prefix = %body_prefix,
                    "tts service answered with an unrecognized response"
                );
                self.edit_status(status, STATUS_SYNTH_FAILED).await;
                DeliveryOutcome::SynthesisFailed
            }
            SynthesisResult::TransportFailure { cause } => {
                tracing::error!(
                    message_id = request.message_id,
                    error = %cause,
                    "tts request failed"
                );
                self.edit_status(status, STATUS_SYNTH_FAILED).await;
                DeliveryOutcome::SynthesisFailed
            }
        }
    }

    /// Stage audio bytes and upload them; the staged file is removed on
    /// every path out of this function.
    async fn stage_and_send(
        &self,
        request: &DeliveryRequest,
        text: &str,
        bytes: &Bytes,
        status: StatusHandle,
    ) -> DeliveryOutcome {
        let staged = match StagedAudio::write(
            &self.staging_dir,
            request.message_id,
            request.sender_id,
            bytes,
        )
        .await
        {
            Ok(staged) => staged,
            Err(e) => {
                tracing::warn!(
                    message_id = request.message_id,
                    dir = %self.staging_dir.display(),
                    error = %e,
                    "failed to stage audio file"
                );
                self.edit_status(status, STATUS_SEND_FAILED).await;
                return DeliveryOutcome::SendFailed;
            }
        };

        let caption = self.caption(text);
        match self
            .outbound
            .send_voice_attachment(request.chat_id, staged.path(), &caption, request.message_id)
            .await
        {
            Ok(()) => {
                if let Err(e) = self.outbound.delete_status(status).await {
                    tracing::debug!(error = %e, "failed to delete status placeholder");
                }
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!(
                    chat_id = request.chat_id,
                    message_id = request.message_id,
                    error = %e,
                    "failed to send voice message"
                );
                self.edit_status(status, STATUS_SEND_FAILED).await;
                DeliveryOutcome::SendFailed
            }
        }
    }

    fn caption(&self, text: &str) -> String {
        format!(
            "🎵 <i>{}</i>\n\n🤖 @{}",
            escape_html(text),
            self.bot_handle
        )
    }

    async fn reply(&self, request: &DeliveryRequest, text: &str) {
        if let Err(e) = self
            .outbound
            .send_text(request.chat_id, text, Some(request.message_id))
            .await
        {
            tracing::warn!(chat_id = request.chat_id, error = %e, "failed to send rejection reply");
        }
    }

    async fn edit_status(&self, status: StatusHandle, text: &str) {
        if let Err(e) = self.outbound.edit_status(status, text).await {
            tracing::debug!(error = %e, "failed to edit status placeholder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::TtsError;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock synthesizer that replays a canned result.
    struct MockSynth {
        response: SynthesisResult,
        calls: AtomicU32,
        models: Mutex<Vec<String>>,
    }

    impl MockSynth {
        fn new(response: SynthesisResult) -> Self {
            Self {
                response,
                calls: AtomicU32::new(0),
                models: Mutex::new(Vec::new()),
            }
        }

        fn inline(bytes: &'static [u8]) -> Self {
            Self::new(SynthesisResult::InlineAudio {
                bytes: Bytes::from_static(bytes),
                content_type: "audio/ogg".to_string(),
            })
        }

        fn remote(url: &str) -> Self {
            Self::new(SynthesisResult::RemoteAudioRef {
                url: url.to_string(),
            })
        }
    }

    #[async_trait]
    impl Synthesizer for MockSynth {
        async fn synthesize(&self, voice_model: &str, _text: &str) -> SynthesisResult {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.models.lock().unwrap().push(voice_model.to_string());
            self.response.clone()
        }
    }

    /// Mock audio source with optional artificial latency.
    struct MockFetcher {
        response: crate::tts::Result<Bytes>,
        calls: AtomicU32,
        delay: Option<Duration>,
    }

    impl MockFetcher {
        fn ok(bytes: &'static [u8]) -> Self {
            Self {
                response: Ok(Bytes::from_static(bytes)),
                calls: AtomicU32::new(0),
                delay: None,
            }
        }

        fn failing(error: TtsError) -> Self {
            Self {
                response: Err(error),
                calls: AtomicU32::new(0),
                delay: None,
            }
        }

        fn slow(bytes: &'static [u8], delay: Duration) -> Self {
            Self {
                response: Ok(Bytes::from_static(bytes)),
                calls: AtomicU32::new(0),
                delay: Some(delay),
            }
        }
    }

    #[async_trait]
    impl AudioSource for MockFetcher {
        async fn fetch(&self, _url: &str) -> crate::tts::Result<Bytes> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.clone()
        }
    }

    #[derive(Debug)]
    struct VoiceSendRecord {
        path: PathBuf,
        caption: String,
        reply_to: i64,
        /// whether the staged file existed at upload time
        existed: bool,
    }

    /// Mock chat surface recording every call.
    struct MockOutbound {
        status_requests: Mutex<Vec<(i64, i64, String)>>,
        edits: Mutex<Vec<String>>,
        deletes: AtomicU32,
        voice_sends: Mutex<Vec<VoiceSendRecord>>,
        texts: Mutex<Vec<(i64, Option<i64>, String)>>,
        fail_send_status: bool,
        fail_send_voice: bool,
    }

    impl MockOutbound {
        fn new() -> Self {
            Self {
                status_requests: Mutex::new(Vec::new()),
                edits: Mutex::new(Vec::new()),
                deletes: AtomicU32::new(0),
                voice_sends: Mutex::new(Vec::new()),
                texts: Mutex::new(Vec::new()),
                fail_send_status: false,
                fail_send_voice: false,
            }
        }

        fn failing_voice_sends() -> Self {
            Self {
                fail_send_voice: true,
                ..Self::new()
            }
        }

        fn failing_status_sends() -> Self {
            Self {
                fail_send_status: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl OutboundChannel for MockOutbound {
        async fn send_status(
            &self,
            chat_id: i64,
            reply_to: i64,
            text: &str,
        ) -> Result<StatusHandle, OutboundError> {
            if self.fail_send_status {
                return Err(OutboundError::Transport("injected".to_string()));
            }
            self.status_requests
                .lock()
                .unwrap()
                .push((chat_id, reply_to, text.to_string()));
            Ok(StatusHandle {
                chat_id,
                message_id: 999,
            })
        }

        async fn edit_status(
            &self,
            _handle: StatusHandle,
            text: &str,
        ) -> Result<(), OutboundError> {
            self.edits.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn delete_status(&self, _handle: StatusHandle) -> Result<(), OutboundError> {
            self.deletes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn send_voice_attachment(
            &self,
            _chat_id: i64,
            voice: &Path,
            caption: &str,
            reply_to: i64,
        ) -> Result<(), OutboundError> {
            self.voice_sends.lock().unwrap().push(VoiceSendRecord {
                path: voice.to_path_buf(),
                caption: caption.to_string(),
                reply_to,
                existed: voice.exists(),
            });
            if self.fail_send_voice {
                return Err(OutboundError::Transport("injected".to_string()));
            }
            Ok(())
        }

        async fn send_text(
            &self,
            chat_id: i64,
            text: &str,
            reply_to: Option<i64>,
        ) -> Result<(), OutboundError> {
            self.texts
                .lock()
                .unwrap()
                .push((chat_id, reply_to, text.to_string()));
            Ok(())
        }
    }

    struct Setup {
        synth: Arc<MockSynth>,
        fetcher: Arc<MockFetcher>,
        outbound: Arc<MockOutbound>,
        pipeline: DeliveryPipeline,
        _dir: tempfile::TempDir,
    }

    fn setup(synth: MockSynth, fetcher: MockFetcher, outbound: MockOutbound) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(synth);
        let fetcher = Arc::new(fetcher);
        let outbound = Arc::new(outbound);
        let pipeline = DeliveryPipeline::new(
            synth.clone(),
            fetcher.clone(),
            outbound.clone(),
            VoiceTable::default(),
            dir.path(),
            "ovoz_bot",
        );
        Setup {
            synth,
            fetcher,
            outbound,
            pipeline,
            _dir: dir,
        }
    }

    fn request(text: &str) -> DeliveryRequest {
        DeliveryRequest {
            chat_id: 10,
            sender_id: 9,
            message_id: 42,
            text: text.to_string(),
            voice: VoicePreference::Female,
        }
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_rejected_before_synthesis() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        let outcome = s.pipeline.deliver(&request("   \n\t ")).await;

        assert_eq!(outcome, DeliveryOutcome::RejectedEmpty);
        assert_eq!(s.synth.calls.load(Ordering::Relaxed), 0);
        let texts = s.outbound.texts.lock().unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0], (10, Some(42), REPLY_EMPTY_TEXT.to_string()));
        assert!(s.outbound.status_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_over_limit_text_is_rejected_before_synthesis() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        let outcome = s.pipeline.deliver(&request(&"x".repeat(1001))).await;

        assert_eq!(outcome, DeliveryOutcome::RejectedTooLong);
        assert_eq!(s.synth.calls.load(Ordering::Relaxed), 0);
        assert_eq!(
            s.outbound.texts.lock().unwrap()[0].2,
            REPLY_TOO_LONG.to_string()
        );
    }

    #[tokio::test]
    async fn test_limit_is_inclusive_at_exactly_max_chars() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        let outcome = s.pipeline.deliver(&request(&"x".repeat(1000))).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(s.synth.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_limit_applies_to_the_trimmed_text() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        // surrounding whitespace does not count against the limit
        let padded = format!("   {}   ", "x".repeat(1000));
        let outcome = s.pipeline.deliver(&request(&padded)).await;
        assert_eq!(outcome, DeliveryOutcome::Delivered);

        let over = format!(" {} ", "x".repeat(1001));
        let outcome = s.pipeline.deliver(&request(&over)).await;
        assert_eq!(outcome, DeliveryOutcome::RejectedTooLong);
    }

    #[tokio::test]
    async fn test_trimmed_text_reaches_the_caption() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        s.pipeline.deliver(&request("  salom  ")).await;

        let sends = s.outbound.voice_sends.lock().unwrap();
        assert_eq!(sends[0].caption, "🎵 <i>salom</i>\n\n🤖 @ovoz_bot");
    }

    #[tokio::test]
    async fn test_limit_counts_characters_not_bytes() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        // 1000 multibyte characters stay within the limit
        let outcome = s.pipeline.deliver(&request(&"ў".repeat(1000))).await;
        assert_eq!(outcome, DeliveryOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_inline_audio_is_staged_sent_and_cleaned_up() {
        let s = setup(
            MockSynth::inline(b"OggS-inline"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        let outcome = s.pipeline.deliver(&request("salom")).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(s.fetcher.calls.load(Ordering::Relaxed), 0);

        // status placeholder was posted as a reply, then deleted
        let statuses = s.outbound.status_requests.lock().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0], (10, 42, STATUS_PREPARING.to_string()));
        assert_eq!(s.outbound.deletes.load(Ordering::Relaxed), 1);
        assert!(s.outbound.edits.lock().unwrap().is_empty());

        // the upload saw the staged file, and it is gone now
        let sends = s.outbound.voice_sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].existed);
        assert!(!sends[0].path.exists());
        assert!(sends[0].path.ends_with("audio_42_9.ogg"));
        assert_eq!(sends[0].reply_to, 42);
        assert_eq!(sends[0].caption, "🎵 <i>salom</i>\n\n🤖 @ovoz_bot");
    }

    #[tokio::test]
    async fn test_caption_escapes_user_markup() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        s.pipeline.deliver(&request("<b>bold</b> & co")).await;

        let sends = s.outbound.voice_sends.lock().unwrap();
        assert_eq!(
            sends[0].caption,
            "🎵 <i>&lt;b&gt;bold&lt;/b&gt; &amp; co</i>\n\n🤖 @ovoz_bot"
        );
    }

    #[tokio::test]
    async fn test_voice_preference_selects_model() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        let mut male = request("salom");
        male.voice = VoicePreference::Male;
        s.pipeline.deliver(&male).await;
        s.pipeline.deliver(&request("salom")).await;

        let models = s.synth.models.lock().unwrap();
        assert_eq!(
            models.as_slice(),
            ["uz-UZ-SardorNeural", "uz-UZ-MadinaNeural"]
        );
    }

    #[tokio::test]
    async fn test_remote_reference_is_fetched_then_delivered() {
        let s = setup(
            MockSynth::remote("https://cdn.example/a.ogg"),
            MockFetcher::ok(b"OggS-remote"),
            MockOutbound::new(),
        );

        let outcome = s.pipeline.deliver(&request("salom")).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(s.fetcher.calls.load(Ordering::Relaxed), 1);
        assert_eq!(s.outbound.deletes.load(Ordering::Relaxed), 1);
        let sends = s.outbound.voice_sends.lock().unwrap();
        assert!(sends[0].existed);
        assert!(!sends[0].path.exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_edits_status_and_stages_nothing() {
        let s = setup(
            MockSynth::remote("https://cdn.example/a.ogg"),
            MockFetcher::failing(TtsError::Status(404)),
            MockOutbound::new(),
        );

        let outcome = s.pipeline.deliver(&request("salom")).await;

        assert_eq!(outcome, DeliveryOutcome::FetchFailed);
        assert_eq!(
            s.outbound.edits.lock().unwrap().as_slice(),
            [STATUS_FETCH_FAILED.to_string()]
        );
        assert_eq!(s.outbound.deletes.load(Ordering::Relaxed), 0);
        assert!(s.outbound.voice_sends.lock().unwrap().is_empty());
        // nothing was left behind in the staging directory
        assert_eq!(std::fs::read_dir(s._dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_reports_synthesis_failure() {
        let s = setup(
            MockSynth::new(SynthesisResult::TransportFailure {
                cause: TtsError::Timeout,
            }),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        let outcome = s.pipeline.deliver(&request("salom")).await;

        assert_eq!(outcome, DeliveryOutcome::SynthesisFailed);
        assert_eq!(s.fetcher.calls.load(Ordering::Relaxed), 0);
        assert_eq!(
            s.outbound.edits.lock().unwrap().as_slice(),
            [STATUS_SYNTH_FAILED.to_string()]
        );
    }

    #[tokio::test]
    async fn test_unrecognized_response_reports_synthesis_failure() {
        let s = setup(
            MockSynth::new(SynthesisResult::Unrecognized {
                body_prefix: "<html>502".to_string(),
            }),
            MockFetcher::ok(b""),
            MockOutbound::new(),
        );

        let outcome = s.pipeline.deliver(&request("salom")).await;

        assert_eq!(outcome, DeliveryOutcome::SynthesisFailed);
        assert_eq!(
            s.outbound.edits.lock().unwrap().as_slice(),
            [STATUS_SYNTH_FAILED.to_string()]
        );
    }

    #[tokio::test]
    async fn test_upload_failure_edits_status_and_removes_staged_file() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::failing_voice_sends(),
        );

        let outcome = s.pipeline.deliver(&request("salom")).await;

        assert_eq!(outcome, DeliveryOutcome::SendFailed);
        assert_eq!(
            s.outbound.edits.lock().unwrap().as_slice(),
            [STATUS_SEND_FAILED.to_string()]
        );
        let sends = s.outbound.voice_sends.lock().unwrap();
        assert!(sends[0].existed);
        assert!(!sends[0].path.exists());
    }

    #[tokio::test]
    async fn test_status_send_failure_short_circuits() {
        let s = setup(
            MockSynth::inline(b"audio"),
            MockFetcher::ok(b""),
            MockOutbound::failing_status_sends(),
        );

        let outcome = s.pipeline.deliver(&request("salom")).await;

        assert_eq!(outcome, DeliveryOutcome::SendFailed);
        assert_eq!(s.synth.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_staging_failure_reports_send_failed() {
        let dir = tempfile::tempdir().unwrap();
        let outbound = Arc::new(MockOutbound::new());
        let pipeline = DeliveryPipeline::new(
            Arc::new(MockSynth::inline(b"audio")),
            Arc::new(MockFetcher::ok(b"")),
            outbound.clone(),
            VoiceTable::default(),
            dir.path().join("does-not-exist"),
            "ovoz_bot",
        );

        let outcome = pipeline.deliver(&request("salom")).await;

        assert_eq!(outcome, DeliveryOutcome::SendFailed);
        assert_eq!(
            outbound.edits.lock().unwrap().as_slice(),
            [STATUS_SEND_FAILED.to_string()]
        );
        assert!(outbound.voice_sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_deliveries_for_one_sender_use_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let outbound = Arc::new(MockOutbound::new());
        let slow = DeliveryPipeline::new(
            Arc::new(MockSynth::remote("https://cdn.example/slow.ogg")),
            Arc::new(MockFetcher::slow(b"slow-bytes", Duration::from_millis(50))),
            outbound.clone(),
            VoiceTable::default(),
            dir.path(),
            "ovoz_bot",
        );
        let fast = DeliveryPipeline::new(
            Arc::new(MockSynth::inline(b"fast-bytes")),
            Arc::new(MockFetcher::ok(b"")),
            outbound.clone(),
            VoiceTable::default(),
            dir.path(),
            "ovoz_bot",
        );

        let mut slow_request = request("first");
        slow_request.message_id = 100;
        let mut fast_request = request("second");
        fast_request.message_id = 101;

        let (slow_outcome, fast_outcome) =
            tokio::join!(slow.deliver(&slow_request), fast.deliver(&fast_request));

        assert_eq!(slow_outcome, DeliveryOutcome::Delivered);
        assert_eq!(fast_outcome, DeliveryOutcome::Delivered);

        let sends = outbound.voice_sends.lock().unwrap();
        assert_eq!(sends.len(), 2);
        assert_ne!(sends[0].path, sends[1].path);
        // each upload saw its own file intact, and both are gone now
        assert!(sends.iter().all(|send| send.existed));
        assert!(sends.iter().all(|send| !send.path.exists()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
