use crate::error::DeskError;
use crate::model::ChatModel;
use crate::types::{AgentKind, Message};
use std::sync::Arc;
use tracing::debug;

/// System prompt for the front desk classifier.
const FRONT_DESK_PROMPT: &str = "\
You are the Front Desk Agent for a Strength & Conditioning Gym.

For simple greetings, small talk, or thank-you messages, respond directly in a friendly, brief manner.

For questions or requests that need specialist help, respond with ONLY ONE of these agent names:
- RAGAgent (for gym info, policies, hours, location, programs)
- BookingAgent (for class bookings and cancellations)

Examples:
User: \"Hi!\" -> \"Hello! Welcome to our gym. How can I assist you today?\"
User: \"What are the gym's operating hours?\" -> \"RAGAgent\"
User: \"Book me a class\" -> \"BookingAgent\"
User: \"Thanks!\" -> \"You're welcome! Have a great workout!\"";

/// Outcome of classifying the latest user turn.
#[derive(Debug, Clone)]
pub enum RouterDecision {
    /// The front desk answered itself; the reply becomes the new assistant message.
    Direct(Message),
    /// Hand the conversation to a specialist agent. Nothing is appended.
    Handoff(AgentKind),
}

/// The intent router: one model call over the conversation history.
pub struct FrontDesk {
    model: Arc<dyn ChatModel>,
}

impl FrontDesk {
    /// Sampling temperature for the classifier.
    pub const TEMPERATURE: f32 = 0.3;

    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Classify the latest user message. The model is invoked without tools;
    /// its reply either names an agent exactly or is the direct answer.
    pub async fn classify(&self, history: &[Message]) -> Result<RouterDecision, DeskError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(FRONT_DESK_PROMPT));
        messages.extend_from_slice(history);

        let turn = self.model.complete(&messages, &[]).await?;
        let decision = Self::decide(turn.content.trim());
        debug!(?decision, "front desk classified turn");
        Ok(decision)
    }

    /// An exact label match hands off; anything else degrades to a direct
    /// reply. Ambiguous output is never retried.
    fn decide(reply: &str) -> RouterDecision {
        match AgentKind::from_label(reply) {
            Some(kind) => RouterDecision::Handoff(kind),
            None => RouterDecision::Direct(Message::assistant(reply)),
        }
    }
}
