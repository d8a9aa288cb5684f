//! Per-turn system instruction assembly.
//!
//! Builds the single system-role message sent with each completion call.
//! The instruction always carries the fixed identity rules; the rest
//! branches on what the catalog/archive resolution produced. It is never
//! appended to the persisted transcript.

use chrono::Utc;

use crate::archive::ArchiveSearchResult;
use crate::config::{InferenceConfig, PersonaConfig};
use crate::router::RoutingDecision;

/// What the resolution phase produced for this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No lookup was performed (greetings, general chat).
    NoSearch,
    /// The local catalog resolved the query.
    CatalogHit {
        /// Resolved title.
        title: String,
        /// Resolvable link for the title.
        link: String,
    },
    /// The archive search ran; its result is embedded here.
    Archive(ArchiveSearchResult),
}

/// The assembled instruction plus the turn's token budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInstruction {
    /// Instruction text, prepended as the sole system message.
    pub text: String,
    /// Maximum output tokens for the completion call.
    pub max_tokens: u32,
}

/// Builds [`SystemInstruction`]s from identity facts and turn outcomes.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: PersonaConfig,
    max_tokens: u32,
    max_tokens_code: u32,
}

impl PromptAssembler {
    /// Create an assembler from the persona and token budgets.
    #[must_use]
    pub fn new(persona: PersonaConfig, inference: &InferenceConfig) -> Self {
        Self {
            persona,
            max_tokens: inference.max_tokens,
            max_tokens_code: inference.max_tokens_code,
        }
    }

    /// Assemble the instruction for one turn.
    ///
    /// `is_code_request` grants the larger token budget.
    #[must_use]
    pub fn build(
        &self,
        decision: RoutingDecision,
        outcome: &TurnOutcome,
        is_code_request: bool,
    ) -> SystemInstruction {
        let mut text = self.identity_rules();

        match outcome {
            TurnOutcome::Archive(ArchiveSearchResult::ConfigError) => {
                text.push_str(
                    "\nFile search is currently unavailable. Proceed as a normal \
                     conversational assistant and do not mention missing credentials.\n",
                );
            }
            TurnOutcome::Archive(ArchiveSearchResult::Found {
                link,
                date,
                size,
                format,
                caption,
            }) => {
                text.push_str(&format!(
                    "\nThe requested file was found in the archive:\n\
                     - Link: {link}\n\
                     - Size: {size}\n\
                     - Uploaded: {date}\n\
                     - Format: {format}\n\
                     - Caption: {caption}\n\
                     Present the link, size and date to the user exactly as given. \
                     Do not alter, shorten or re-word the link text.\n"
                ));
            }
            TurnOutcome::CatalogHit { title, link } => {
                text.push_str(&format!(
                    "\n\"{title}\" is available here: {link}\n\
                     Present the title and link to the user exactly as given. \
                     Do not alter, shorten or re-word the link text.\n"
                ));
            }
            TurnOutcome::Archive(ArchiveSearchResult::NotFound) | TurnOutcome::NoSearch => {
                if decision == RoutingDecision::MovieQuery {
                    text.push_str(&format!(
                        "\nThe requested movie was not found. Apologize briefly and \
                         share the channel link: {}\n",
                        self.persona.channel_link
                    ));
                }
                text.push_str(
                    "\nIf asked who you are or who made you, answer with the identity \
                     facts above. Otherwise answer the question normally.\n",
                );
            }
        }

        SystemInstruction {
            text,
            max_tokens: if is_code_request {
                self.max_tokens_code
            } else {
                self.max_tokens
            },
        }
    }

    /// Fixed identity rules included in every instruction.
    fn identity_rules(&self) -> String {
        let today = Utc::now().format("%d %B %Y");
        format!(
            "You are \"{name}\", a smart assistant created by {owner}.\n\
             \n\
             RULES:\n\
             1. Today's date: {today}.\n\
             2. Language: Speak in Hinglish (Hindi + English mix).\n\
             3. Creator: If asked \"Who made you?\", say: \"Main {owner} ka Assistant hoon.\"\n\
             4. Identity: You are NOT a generic AI. You are {owner}'s personal assistant, \
             based in {location}.\n\
             5. Greetings: If the user only greets you, reply exactly: \
             \"Namaste! Main {name} hoon. Aap kaise madad chahte hain?\"\n\
             6. Tone: Be friendly, professional and helpful.\n",
            name = self.persona.assistant_name,
            owner = self.persona.owner_name,
            location = self.persona.owner_location,
        )
    }
}
