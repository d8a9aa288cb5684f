//! The per-session turn engine.
//!
//! Owns the transcript and every capability, and drives one turn
//! synchronously end-to-end: route → resolve (catalog/archive) → assemble
//! instruction → stream completion → optional side effects. Remote
//! operations within a turn are strictly sequenced; the transcript has a
//! single writer (this engine).

use tracing::{debug, warn};
use uuid::Uuid;

use crate::aggregate::{DisplaySink, aggregate};
use crate::archive::{ArchiveClient, ArchiveConnector};
use crate::catalog::Catalog;
use crate::completion::{ChatMessage, CompletionClient};
use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::media::{ImageGenerator, SpeechSynthesizer, VisionCaptioner};
use crate::prompt::{PromptAssembler, TurnOutcome};
use crate::router::{IntentRouter, RoutingDecision, TurnInput};
use crate::transcript::{Message, Role, Transcript};

/// Drives turns for one conversation session.
pub struct TurnEngine {
    transcript: Transcript,
    catalog: Catalog,
    router: IntentRouter,
    assembler: PromptAssembler,
    archive: ArchiveClient<Box<dyn ArchiveConnector>>,
    completion: Box<dyn CompletionClient>,
    image: Option<Box<dyn ImageGenerator>>,
    vision: Option<Box<dyn VisionCaptioner>>,
    speech: Option<Box<dyn SpeechSynthesizer>>,
    voice_max_chars: usize,
}

impl TurnEngine {
    /// Create an engine for one session.
    ///
    /// Fails fast when the inference token is absent: no turn can proceed
    /// without the completion capability, so this is the fatal boundary.
    pub fn new(
        config: AssistantConfig,
        catalog: Catalog,
        completion: Box<dyn CompletionClient>,
        connector: Box<dyn ArchiveConnector>,
    ) -> Result<Self> {
        config.validate()?;
        let assembler = PromptAssembler::new(config.persona.clone(), &config.inference);
        let archive = ArchiveClient::new(
            config.archive.clone(),
            connector,
            config.routing.greetings.clone(),
        );
        Ok(Self {
            transcript: Transcript::new(),
            catalog,
            router: IntentRouter::new(config.routing.clone()),
            assembler,
            archive,
            completion,
            image: None,
            vision: None,
            speech: None,
            voice_max_chars: config.voice.max_chars,
        })
    }

    /// Attach the image generation capability.
    #[must_use]
    pub fn with_image_generator(mut self, generator: Box<dyn ImageGenerator>) -> Self {
        self.image = Some(generator);
        self
    }

    /// Attach the vision captioning capability.
    #[must_use]
    pub fn with_vision_captioner(mut self, captioner: Box<dyn VisionCaptioner>) -> Self {
        self.vision = Some(captioner);
        self
    }

    /// Attach the speech synthesis capability.
    #[must_use]
    pub fn with_speech_synthesizer(mut self, synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(synthesizer);
        self
    }

    /// The session transcript.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Empty the transcript.
    pub fn reset(&mut self) {
        self.transcript.reset();
    }

    /// Process one turn: mutate the transcript and drive the display sink.
    ///
    /// Image and vision failures surface as errors with nothing stored for
    /// the action. A completion stream that fails mid-turn returns its
    /// error after appending the partial text the user already saw.
    pub async fn handle_turn(
        &mut self,
        input: TurnInput,
        sink: &mut dyn DisplaySink,
    ) -> Result<()> {
        let turn_id = Uuid::new_v4();
        let decision = self.router.route(&input);
        debug!(%turn_id, ?decision, "routing turn");

        match decision {
            RoutingDecision::VisionAnalysis => self.analyze_image(&input, sink).await,
            RoutingDecision::ImageGeneration => self.generate_image(&input).await,
            RoutingDecision::MovieQuery => {
                self.transcript
                    .append(Message::text(Role::User, &input.utterance));
                let outcome = match self.catalog.resolve(&input.utterance) {
                    Some(entry) => TurnOutcome::CatalogHit {
                        title: entry.key.clone(),
                        link: entry.link.clone(),
                    },
                    None => TurnOutcome::Archive(self.archive.search(&input.utterance).await),
                };
                self.stream_reply(&input, decision, &outcome, sink).await
            }
            RoutingDecision::Greeting | RoutingDecision::GeneralChat => {
                self.transcript
                    .append(Message::text(Role::User, &input.utterance));
                self.stream_reply(&input, decision, &TurnOutcome::NoSearch, sink)
                    .await
            }
        }
    }

    /// Caption an uploaded image. The completion capability is not involved.
    async fn analyze_image(&mut self, input: &TurnInput, sink: &mut dyn DisplaySink) -> Result<()> {
        let Some(vision) = &self.vision else {
            return Err(AssistantError::Vision(
                "vision capability is not configured".to_string(),
            ));
        };
        let Some(image) = &input.image else {
            return Err(AssistantError::Vision("no image was uploaded".to_string()));
        };

        let caption = vision.caption(image).await?;
        let text = format!("Image analysis: {caption}");
        sink.update(&text);
        self.transcript.append(Message::text(Role::Assistant, text));
        Ok(())
    }

    /// Synthesize an image from the utterance. Never invokes completion.
    async fn generate_image(&mut self, input: &TurnInput) -> Result<()> {
        self.transcript
            .append(Message::text(Role::User, &input.utterance));

        let Some(generator) = &self.image else {
            return Err(AssistantError::Image(
                "image capability is not configured".to_string(),
            ));
        };

        // Error surfaces to the caller; no assistant message is stored.
        let bytes = generator.generate(&input.utterance).await?;
        self.transcript
            .append(Message::image(bytes, input.utterance.clone()));
        Ok(())
    }

    /// Assemble the instruction, stream the completion, store the reply.
    async fn stream_reply(
        &mut self,
        input: &TurnInput,
        decision: RoutingDecision,
        outcome: &TurnOutcome,
        sink: &mut dyn DisplaySink,
    ) -> Result<()> {
        let is_code = self.router.is_code_request(&input.utterance);
        let instruction = self.assembler.build(decision, outcome, is_code);

        // The instruction is the sole system entry for this call; it is
        // not persisted to the transcript.
        let mut messages = vec![ChatMessage::system(instruction.text)];
        for (role, text) in self.transcript.text_messages() {
            messages.push(ChatMessage {
                role,
                content: text.to_string(),
            });
        }

        let fragments = self
            .completion
            .stream_chat(&messages, instruction.max_tokens)
            .await?;
        let reply = aggregate(fragments, sink).await;

        match reply.error {
            None => {
                self.store_reply(reply.text).await;
                Ok(())
            }
            Some(err) => {
                // Partial replies are persisted: the accumulated string is a
                // fully assembled text message and the user already saw it.
                if !reply.text.is_empty() {
                    self.transcript
                        .append(Message::text(Role::Assistant, reply.text));
                }
                Err(err)
            }
        }
    }

    /// Store the finished reply, enriching short ones with audio.
    async fn store_reply(&mut self, text: String) {
        if let Some(speech) = &self.speech
            && !text.is_empty()
            && text.chars().count() < self.voice_max_chars
        {
            match speech.synthesize(&text).await {
                Ok(audio) => {
                    self.transcript.append(Message::voiced(text, audio));
                    return;
                }
                Err(err) => warn!("speech synthesis skipped: {err}"),
            }
        }
        self.transcript.append(Message::text(Role::Assistant, text));
    }
}
