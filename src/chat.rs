//! Conversation state and the request/reveal state machine.
//!
//! Nothing here touches the terminal, the network or timers. The main loop
//! feeds events in (`submit`, `receive`, `tick`) and pulls work out
//! (`next_dispatch`), which keeps every transition testable in isolation.

use std::collections::VecDeque;

use log::{error, info, warn};

use crate::gemini::DispatchError;

/// Appended as a bot turn when a request fails outright.
pub const REQUEST_FAILED: &str = "Error: the API request failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// A single turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    role: Role,
    text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { role: Role::Bot, text: text.into() }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Append-only, insertion-ordered message log.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent bot turn, scanning from the end.
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Bot)
    }
}

/// A reply that has arrived but is still being revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReveal {
    full_text: String,
    revealed_chars: usize,
    total_chars: usize,
}

impl PendingReveal {
    pub fn new(full_text: String) -> Self {
        let total_chars = full_text.chars().count();
        Self { full_text, revealed_chars: 0, total_chars }
    }

    /// The part of the reply shown so far.
    pub fn revealed(&self) -> &str {
        let end = self
            .full_text
            .char_indices()
            .nth(self.revealed_chars)
            .map(|(i, _)| i)
            .unwrap_or(self.full_text.len());
        &self.full_text[..end]
    }

    pub fn is_complete(&self) -> bool {
        self.revealed_chars >= self.total_chars
    }

    fn advance(&mut self) {
        if !self.is_complete() {
            self.revealed_chars += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse,
    Revealing(PendingReveal),
}

/// Result of one reveal tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealTick {
    /// Nothing is being revealed.
    Idle,
    /// One more character became visible.
    Advanced,
    /// The reply was appended to the conversation.
    Committed,
}

/// Owns the conversation and drives `Idle -> AwaitingResponse -> Revealing -> Idle`.
///
/// Exchanges are serialized: a prompt submitted while another exchange is in
/// flight gets its user turn recorded right away but waits in the outbox
/// until the session is idle again.
#[derive(Debug)]
pub struct ChatSession {
    conversation: Conversation,
    phase: Phase,
    outbox: VecDeque<String>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            phase: Phase::Idle,
            outbox: VecDeque::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase == Phase::AwaitingResponse
    }

    pub fn is_revealing(&self) -> bool {
        matches!(self.phase, Phase::Revealing(_))
    }

    pub fn pending_reveal(&self) -> Option<&PendingReveal> {
        match &self.phase {
            Phase::Revealing(reveal) => Some(reveal),
            _ => None,
        }
    }

    /// Prompts submitted but not yet sent.
    pub fn queued(&self) -> usize {
        self.outbox.len()
    }

    /// Records the user turn and queues it for dispatch.
    ///
    /// Returns false (and changes nothing) for blank input. Anything else is
    /// stored and sent exactly as typed.
    pub fn submit(&mut self, input: &str) -> bool {
        if input.trim().is_empty() {
            return false;
        }
        self.conversation.push(Message::user(input));
        self.outbox.push_back(input.to_string());
        true
    }

    /// Hands out the next prompt to send, if the session is idle.
    pub fn next_dispatch(&mut self) -> Option<String> {
        if self.phase != Phase::Idle {
            return None;
        }
        let prompt = self.outbox.pop_front()?;
        self.phase = Phase::AwaitingResponse;
        Some(prompt)
    }

    /// Feeds in the outcome of the in-flight request.
    ///
    /// Success starts a reveal; failure appends [`REQUEST_FAILED`] directly
    /// and returns to idle. Outcomes arriving in any other phase are dropped.
    pub fn receive(&mut self, outcome: Result<String, DispatchError>) -> bool {
        if !self.is_awaiting() {
            warn!("dropping response received while {:?}", self.phase);
            return false;
        }

        match outcome {
            Ok(text) => {
                info!("reply received ({} chars)", text.chars().count());
                self.phase = Phase::Revealing(PendingReveal::new(text));
            }
            Err(e) => {
                error!("API error: {}", e);
                self.conversation.push(Message::bot(REQUEST_FAILED));
                self.phase = Phase::Idle;
            }
        }
        true
    }

    /// One step of the reveal: show one more character, or commit once
    /// everything is visible.
    pub fn tick(&mut self) -> RevealTick {
        let Phase::Revealing(reveal) = &mut self.phase else {
            return RevealTick::Idle;
        };

        if reveal.is_complete() {
            self.commit_reveal();
            RevealTick::Committed
        } else {
            reveal.advance();
            RevealTick::Advanced
        }
    }

    /// Skips the rest of the animation and commits the reply now.
    pub fn finish_reveal(&mut self) -> bool {
        if !self.is_revealing() {
            return false;
        }
        self.commit_reveal();
        true
    }

    fn commit_reveal(&mut self) {
        if let Phase::Revealing(reveal) = std::mem::replace(&mut self.phase, Phase::Idle) {
            self.conversation.push(Message::bot(reveal.full_text));
        }
    }
}
