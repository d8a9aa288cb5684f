//! End-to-end turn tests with scripted capability mocks.
//!
//! Exercise the full route → resolve → assemble → stream → store flow
//! without any network, asserting the ordering and store-consistency
//! guarantees of the engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sahayak::aggregate::DisplaySink;
use sahayak::archive::{ArchiveConnector, ArchiveFile, ArchiveMessage, ArchiveSession};
use sahayak::catalog::Catalog;
use sahayak::completion::{ChatMessage, CompletionClient, TextFragmentStream};
use sahayak::config::{ArchiveConfig, AssistantConfig};
use sahayak::error::{AssistantError, Result};
use sahayak::media::{ImageGenerator, SpeechSynthesizer, VisionCaptioner};
use sahayak::router::TurnInput;
use sahayak::session::TurnEngine;
use sahayak::transcript::{MessageContent, Role};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sahayak=debug")
        .try_init();
}

// ── Mocks ────────────────────────────────────────────────────

/// Completion mock that records requests and replays a fragment script.
struct ScriptedCompletion {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<ChatMessage>>>,
    script: Vec<std::result::Result<String, String>>,
}

impl ScriptedCompletion {
    fn new(script: &[std::result::Result<&str, &str>]) -> (Self, Arc<AtomicUsize>, Arc<Mutex<Vec<ChatMessage>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mock = Self {
            calls: Arc::clone(&calls),
            seen: Arc::clone(&seen),
            script: script
                .iter()
                .map(|item| match item {
                    Ok(text) => Ok((*text).to_string()),
                    Err(msg) => Err((*msg).to_string()),
                })
                .collect(),
        };
        (mock, calls, seen)
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        _max_tokens: u32,
    ) -> Result<TextFragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.extend(messages.iter().cloned());
        }
        let items: Vec<Result<String>> = self
            .script
            .iter()
            .map(|item| match item {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(AssistantError::Stream(msg.clone())),
            })
            .collect();
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}

/// Connector mock counting connections, optionally returning one match.
struct MockConnector {
    connects: Arc<AtomicUsize>,
    result: Option<ArchiveMessage>,
}

struct MockSession {
    result: Option<ArchiveMessage>,
}

#[async_trait]
impl ArchiveConnector for MockConnector {
    async fn connect(&self, _config: &ArchiveConfig) -> anyhow::Result<Box<dyn ArchiveSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            result: self.result.clone(),
        }))
    }
}

#[async_trait]
impl ArchiveSession for MockSession {
    async fn search(
        &mut self,
        _channel_id: &str,
        _term: &str,
        _limit: usize,
    ) -> anyhow::Result<Option<ArchiveMessage>> {
        Ok(self.result.clone())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct MockImage {
    fail: bool,
}

#[async_trait]
impl ImageGenerator for MockImage {
    async fn generate(&self, _prompt: &str) -> Result<Vec<u8>> {
        if self.fail {
            return Err(AssistantError::Image("model overloaded".to_string()));
        }
        Ok(vec![0x89, 0x50, 0x4E, 0x47])
    }
}

struct MockVision;

#[async_trait]
impl VisionCaptioner for MockVision {
    async fn caption(&self, _image: &[u8]) -> Result<String> {
        Ok("a red car parked on a street".to_string())
    }
}

struct MockSpeech {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        if self.fail {
            return Err(AssistantError::Speech("voice backend down".to_string()));
        }
        Ok(vec![0xAA, 0xBB])
    }
}

#[derive(Default)]
struct RecordingSink {
    updates: Vec<String>,
}

impl DisplaySink for RecordingSink {
    fn update(&mut self, text: &str) {
        self.updates.push(text.to_string());
    }
}

// ── Builders ─────────────────────────────────────────────────

fn test_config() -> AssistantConfig {
    let mut config = AssistantConfig::default();
    config.inference.token = Some("hf_test".to_string());
    config.archive = ArchiveConfig {
        api_id: Some(1),
        api_hash: Some("hash".to_string()),
        channel_id: Some("-100555".to_string()),
        bot_token: Some("bot".to_string()),
    };
    config
}

fn test_catalog() -> Catalog {
    Catalog::new(
        [(
            "jawan".to_string(),
            "https://example.com/jawan".to_string(),
        )],
        0.6,
    )
}

fn engine_with(
    script: &[std::result::Result<&str, &str>],
    archive_match: Option<ArchiveMessage>,
) -> (TurnEngine, Arc<AtomicUsize>, Arc<Mutex<Vec<ChatMessage>>>, Arc<AtomicUsize>) {
    init_tracing();
    let (completion, calls, seen) = ScriptedCompletion::new(script);
    let connects = Arc::new(AtomicUsize::new(0));
    let connector = MockConnector {
        connects: Arc::clone(&connects),
        result: archive_match,
    };
    let engine = TurnEngine::new(
        test_config(),
        test_catalog(),
        Box::new(completion),
        Box::new(connector),
    )
    .unwrap_or_else(|err| panic!("engine construction failed: {err}"));
    (engine, calls, seen, connects)
}

fn archive_hit() -> ArchiveMessage {
    ArchiveMessage {
        id: 7,
        date: chrono::Utc::now(),
        text: "Pathaan 1080p".to_string(),
        file: Some(ArchiveFile {
            size: 1024,
            extension: Some("mkv".to_string()),
        }),
    }
}

// ── Turns ────────────────────────────────────────────────────

#[tokio::test]
async fn general_chat_streams_and_stores_one_assistant_message() {
    let (mut engine, _, _, _) = engine_with(&[Ok("He"), Ok("llo")], None);
    let mut sink = RecordingSink::default();

    let result = engine
        .handle_turn(TurnInput::text("what is Rust?"), &mut sink)
        .await;
    assert!(result.is_ok());

    assert_eq!(sink.updates, vec!["He▌", "Hello▌", "Hello"]);

    let messages = engine.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content.text(), Some("Hello"));
}

#[tokio::test]
async fn system_instruction_is_sent_but_never_persisted() {
    let (mut engine, _, seen, _) = engine_with(&[Ok("hi")], None);
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::text("who are you?"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));

    let seen = seen.lock().unwrap_or_else(|e| e.into_inner());
    assert_eq!(seen[0].role, Role::System);
    assert!(seen[0].content.contains("Rajdev AI"));
    // Transcript holds only the user and assistant messages.
    assert!(engine.transcript().messages().iter().all(|m| m.role != Role::System));
}

#[tokio::test]
async fn image_generation_never_invokes_completion() {
    let (engine, calls, _, _) = engine_with(&[Ok("unused")], None);
    let mut engine = engine.with_image_generator(Box::new(MockImage { fail: false }));
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::text("generate image of a sunset"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));

    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let messages = engine.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert!(matches!(
        messages[1].content,
        MessageContent::Image { .. }
    ));
}

#[tokio::test]
async fn image_generation_failure_surfaces_and_stores_nothing() {
    let (engine, _, _, _) = engine_with(&[Ok("unused")], None);
    let mut engine = engine.with_image_generator(Box::new(MockImage { fail: true }));
    let mut sink = RecordingSink::default();

    let err = engine
        .handle_turn(TurnInput::text("draw a dragon"), &mut sink)
        .await
        .err();
    assert!(matches!(err, Some(AssistantError::Image(_))));

    // The user message stays; no assistant message was stored.
    let messages = engine.transcript().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test]
async fn catalog_hit_skips_archive_and_embeds_link() {
    let (mut engine, _, seen, connects) = engine_with(&[Ok("yahan hai")], None);
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::text("jawan movie chahiye"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));

    // Local catalog answered; the archive was never contacted.
    assert_eq!(connects.load(Ordering::SeqCst), 0);

    let seen = seen.lock().unwrap_or_else(|e| e.into_inner());
    assert!(seen[0].content.contains("https://example.com/jawan"));
}

#[tokio::test]
async fn catalog_miss_searches_archive_and_embeds_found_link() {
    let (mut engine, _, seen, connects) = engine_with(&[Ok("mil gaya")], Some(archive_hit()));
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::text("pathaan movie chahiye"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));

    assert_eq!(connects.load(Ordering::SeqCst), 1);

    let seen = seen.lock().unwrap_or_else(|e| e.into_inner());
    // -100 prefix stripped in the deep link.
    assert!(seen[0].content.contains("https://t.me/c/555/7"));
    assert!(seen[0].content.contains("1.0 KB"));
}

#[tokio::test]
async fn archive_miss_prompts_an_apology() {
    let (mut engine, _, seen, _) = engine_with(&[Ok("sorry")], None);
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::text("some obscure film please"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));

    let seen = seen.lock().unwrap_or_else(|e| e.into_inner());
    assert!(seen[0].content.contains("was not found"));
}

#[tokio::test]
async fn mid_stream_failure_persists_partial_and_returns_error() {
    let (mut engine, _, _, _) = engine_with(
        &[Ok("Par"), Ok("tial"), Err("connection reset")],
        None,
    );
    let mut sink = RecordingSink::default();

    let err = engine
        .handle_turn(TurnInput::text("tell me something"), &mut sink)
        .await
        .err();
    assert!(matches!(err, Some(AssistantError::Stream(_))));

    let messages = engine.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content.text(), Some("Partial"));
    assert_eq!(sink.updates.last().map(String::as_str), Some("Partial"));
}

#[tokio::test]
async fn vision_analysis_captions_without_completion() {
    let (engine, calls, _, _) = engine_with(&[Ok("unused")], None);
    let mut engine = engine.with_vision_captioner(Box::new(MockVision));
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::analyze(vec![1, 2, 3]), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let messages = engine.transcript().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].content.text(),
        Some("Image analysis: a red car parked on a street")
    );
}

#[tokio::test]
async fn short_reply_is_voiced() {
    let (engine, _, _, _) = engine_with(&[Ok("Namaste!")], None);
    let mut engine = engine.with_speech_synthesizer(Box::new(MockSpeech { fail: false }));
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::text("hi"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));

    let messages = engine.transcript().messages();
    assert!(matches!(
        messages[1].content,
        MessageContent::VoicedText { .. }
    ));
}

#[tokio::test]
async fn speech_failure_is_silent_and_keeps_text() {
    let (engine, _, _, _) = engine_with(&[Ok("Namaste!")], None);
    let mut engine = engine.with_speech_synthesizer(Box::new(MockSpeech { fail: true }));
    let mut sink = RecordingSink::default();

    let result = engine.handle_turn(TurnInput::text("hi"), &mut sink).await;
    assert!(result.is_ok(), "speech failure must not fail the turn");

    let messages = engine.transcript().messages();
    assert!(matches!(messages[1].content, MessageContent::Text { .. }));
    assert_eq!(messages[1].content.text(), Some("Namaste!"));
}

#[tokio::test]
async fn long_reply_skips_voice_enrichment() {
    let long_reply = "x".repeat(500);
    let (engine, _, _, _) = engine_with(&[Ok(long_reply.as_str())], None);
    let mut engine = engine.with_speech_synthesizer(Box::new(MockSpeech { fail: false }));
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::text("write an essay"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));

    let messages = engine.transcript().messages();
    assert!(matches!(messages[1].content, MessageContent::Text { .. }));
}

#[tokio::test]
async fn reset_empties_the_transcript() {
    let (mut engine, _, _, _) = engine_with(&[Ok("answer")], None);
    let mut sink = RecordingSink::default();

    engine
        .handle_turn(TurnInput::text("question one"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("turn failed: {err}"));
    assert!(!engine.transcript().is_empty());

    engine.reset();
    assert!(engine.transcript().is_empty());
}

#[tokio::test]
async fn missing_inference_token_is_fatal_at_construction() {
    let (completion, _, _) = ScriptedCompletion::new(&[]);
    let connector = MockConnector {
        connects: Arc::new(AtomicUsize::new(0)),
        result: None,
    };
    let config = AssistantConfig::default(); // no token
    let err = TurnEngine::new(
        config,
        test_catalog(),
        Box::new(completion),
        Box::new(connector),
    )
    .err();
    assert!(matches!(err, Some(AssistantError::Config(_))));
}
