mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use common::{model_answer, ScriptedCompleter, TRANSCRIPT};
use speech_coach_lib::analysis::{RecordingMetadata, SpeechAnalyzer};
use speech_coach_lib::service::{
    AnalysisService, MemoryRecordingStore, Plan, ServiceError, SessionProvider, UserIdentity,
};
use speech_coach_lib::transcription::{Transcriber, Transcription, WordSpan};
use speech_coach_lib::AnalysisError;

struct FixedSession(Option<UserIdentity>);

#[async_trait]
impl SessionProvider for FixedSession {
    async fn current_user(&self) -> Option<UserIdentity> {
        self.0.clone()
    }
}

/// Returns the shared transcript, or fails when `fail` is set.
#[derive(Default)]
struct StubTranscriber {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio_url: &str) -> Result<Transcription, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AnalysisError::Acquisition {
                provider: "stub",
                message: "upstream returned 503".to_string(),
            });
        }
        Ok(Transcription {
            text: TRANSCRIPT.to_string(),
            word_timestamps: vec![WordSpan::new("Good", 0.0, 0.3)],
        })
    }
}

fn user(id: &str, quota_remaining: Option<u32>) -> UserIdentity {
    UserIdentity {
        id: id.to_string(),
        quota_remaining,
    }
}

struct Fixture {
    store: Arc<MemoryRecordingStore>,
    transcriber: Arc<StubTranscriber>,
    completer: Arc<ScriptedCompleter>,
    recording_id: String,
}

impl Fixture {
    async fn new(failing_transcriber: bool) -> Self {
        let store = Arc::new(MemoryRecordingStore::new());
        let recording = store
            .add_recording(
                "alice",
                "https://storage.example/recordings/1.webm",
                RecordingMetadata::new(45.0, "presentation", "team"),
            )
            .await;
        Self {
            store,
            transcriber: Arc::new(StubTranscriber {
                fail: failing_transcriber,
                ..Default::default()
            }),
            completer: Arc::new(ScriptedCompleter::new(vec![Ok(model_answer().to_string())])),
            recording_id: recording.id,
        }
    }

    fn service(&self, session: Option<UserIdentity>) -> AnalysisService {
        AnalysisService::new(
            Arc::new(FixedSession(session)),
            self.store.clone(),
            self.transcriber.clone(),
            Arc::new(SpeechAnalyzer::new(self.completer.clone())),
        )
    }

    fn transcriptions(&self) -> usize {
        self.transcriber.calls.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn owner_with_quota_gets_a_stored_analysis() -> Result<()> {
    let fixture = Fixture::new(false).await;
    let stored = fixture
        .service(Some(user("alice", Some(2))))
        .analyze_recording(&fixture.recording_id)
        .await?;

    assert_eq!(stored.recording_id, fixture.recording_id);
    assert_eq!(stored.analysis.transcription, TRANSCRIPT);
    assert_eq!(stored.analysis.word_analysis.overall_pronunciation_score, 78.0);
    assert_eq!(fixture.store.analyses_for(&fixture.recording_id).await, vec![stored]);
    Ok(())
}

#[tokio::test]
async fn unlimited_plan_is_not_quota_checked() -> Result<()> {
    let fixture = Fixture::new(false).await;
    fixture
        .service(Some(UserIdentity::on_plan("alice", Plan::Premium, 250)))
        .analyze_recording(&fixture.recording_id)
        .await?;
    assert_eq!(fixture.transcriptions(), 1);
    Ok(())
}

#[tokio::test]
async fn anonymous_request_is_rejected() {
    let fixture = Fixture::new(false).await;
    let err = fixture
        .service(None)
        .analyze_recording(&fixture.recording_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotAuthenticated));
    assert_eq!(fixture.transcriptions(), 0);
}

#[tokio::test]
async fn unknown_recording_is_not_found() {
    let fixture = Fixture::new(false).await;
    let err = fixture
        .service(Some(user("alice", None)))
        .analyze_recording("no-such-recording")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::RecordingNotFound(id) if id == "no-such-recording"));
}

#[tokio::test]
async fn foreign_recording_is_forbidden() {
    let fixture = Fixture::new(false).await;
    let err = fixture
        .service(Some(user("mallory", None)))
        .analyze_recording(&fixture.recording_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    assert_eq!(fixture.transcriptions(), 0);
}

#[tokio::test]
async fn exhausted_quota_stops_before_transcription() {
    let fixture = Fixture::new(false).await;
    let err = fixture
        .service(Some(UserIdentity::on_plan("alice", Plan::Free, 3)))
        .analyze_recording(&fixture.recording_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::QuotaExceeded));
    assert_eq!(fixture.transcriptions(), 0);
    assert!(fixture.completer.requests().is_empty());
}

#[tokio::test]
async fn transcription_failure_propagates_and_nothing_is_stored() {
    let fixture = Fixture::new(true).await;
    let err = fixture
        .service(Some(user("alice", Some(3))))
        .analyze_recording(&fixture.recording_id)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Acquisition(AnalysisError::Acquisition { provider: "stub", .. })
    ));
    assert_eq!(fixture.transcriptions(), 1);
    assert!(fixture.completer.requests().is_empty());
    assert!(fixture.store.analyses_for(&fixture.recording_id).await.is_empty());
}
