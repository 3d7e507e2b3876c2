use crate::error::DeskError;
use crate::model::ChatModel;
use crate::tool_registry::ToolRegistry;
use crate::types::{AssistantTurn, Message, ToolCall};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// System prompt for the retrieval agent.
const RAG_PROMPT: &str = "\
You are an assistant that answers questions about Strength & Conditioning Gym.
Use only the provided context. If the answer is not in the context, say you don't have the information.
Be concise and to the point.";

/// System prompt for the booking agent. The date, slot-filling, and
/// confirmation rules are behavioral contracts, not suggestions.
const BOOKING_PROMPT: &str = "\
You are the Booking Agent for a Strength & Conditioning Gym.

Booking:
- Extract class_name, member_id, and date from the user.
- NEVER ask the user for a YYYY-MM-DD date; compute it yourself.
- If class_name, member_id, or date is missing or unclear, ask a brief question.
- After booking, confirm with: Booked class_name for date. Booking ID: booking_id.

Availability / listing:
- If the user asks what's available on a date, call list_available_classes.
- If the user asks whether a specific class has spots, call check_availability.

Cancellation:
- Extract booking_id and member_id. If either is missing, ask for it.
- If both are present, ask: Are you sure? Reply \"yes\" to confirm.
- Only AFTER an explicit \"yes\" from the user may you call cancel_booking.
- On \"no\" or anything else, abort and confirm nothing was cancelled.

Rules:
- Never cancel without confirmation.
- Never call tools without the required information.
- Never guess missing data.
- Always call get_current_date before computing dates yourself.";

/// A specialist agent node: a chat model bound to a fixed system prompt and
/// tool set. The conversation graph drives it by alternating [`Agent::invoke`]
/// and [`Agent::execute_calls`].
pub struct Agent {
    name: &'static str,
    system_prompt: &'static str,
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    /// Sampling temperature for the specialist agents.
    pub const TEMPERATURE: f32 = 0.0;

    /// The retrieval agent.
    pub fn rag(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            name: "rag",
            system_prompt: RAG_PROMPT,
            model,
            tools,
        }
    }

    /// The booking agent.
    pub fn booking(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            name: "booking",
            system_prompt: BOOKING_PROMPT,
            model,
            tools,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invoke the model with the system prompt, the session history, and the
    /// messages produced so far this turn.
    pub async fn invoke(
        &self,
        history: &[Message],
        produced: &[Message],
    ) -> Result<AssistantTurn, DeskError> {
        let mut context = Vec::with_capacity(1 + history.len() + produced.len());
        context.push(Message::system(self.system_prompt));
        context.extend_from_slice(history);
        context.extend_from_slice(produced);

        self.model.complete(&context, &self.tools.schemas()).await
    }

    /// Execute the requested tool calls in order, returning one tool-result
    /// message per call, keyed to the call's id.
    ///
    /// A call naming an unregistered tool fails the turn with
    /// [`DeskError::ToolNotFound`]. Malformed arguments and tool-level
    /// failures are recoverable: the error text goes back to the model.
    pub async fn execute_calls(&self, calls: &[ToolCall]) -> Result<Vec<Message>, DeskError> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            info!(agent = self.name, tool = %call.name, "calling tool");

            let args: Value = if call.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                match serde_json::from_str(&call.arguments) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(agent = self.name, tool = %call.name, "invalid tool arguments: {}", e);
                        results.push(Message::tool_result(
                            &call.id,
                            format!("Invalid JSON arguments: {}", e),
                        ));
                        continue;
                    }
                }
            };

            let output = self.tools.execute(&call.name, &call.id, args).await?;
            if output.is_error {
                warn!(agent = self.name, tool = %call.name, "tool failed: {}", output.content);
            }
            results.push(Message::tool_result(&call.id, output.content));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tool_call, ScriptedModel, StaticTool};
    use crate::types::{AssistantTurn, Role};

    fn rag_agent(model: Arc<ScriptedModel>, tool: Arc<StaticTool>) -> Agent {
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        Agent::rag(model, Arc::new(registry))
    }

    #[tokio::test]
    async fn test_execute_calls_keeps_order_and_ids() {
        let model = ScriptedModel::new([]);
        let tool = StaticTool::new("retriever_tool", "Document 1:\npassage");
        let agent = rag_agent(model, tool.clone());

        let calls = vec![
            tool_call("call-1", "retriever_tool", r#"{"query":"hours"}"#),
            tool_call("call-2", "retriever_tool", r#"{"query":"pricing"}"#),
        ];
        let results = agent.execute_calls(&calls).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(results[1].tool_call_id.as_deref(), Some("call-2"));
        assert!(results.iter().all(|m| m.role == Role::Tool));
        assert_eq!(tool.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_the_turn() {
        let model = ScriptedModel::new([]);
        let agent = rag_agent(model, StaticTool::new("retriever_tool", "x"));

        let calls = vec![tool_call("call-1", "no_such_tool", "{}")];
        let err = agent.execute_calls(&calls).await.unwrap_err();
        assert!(matches!(err, DeskError::ToolNotFound(name) if name == "no_such_tool"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_become_error_text() {
        let model = ScriptedModel::new([]);
        let tool = StaticTool::new("retriever_tool", "x");
        let agent = rag_agent(model, tool.clone());

        let calls = vec![tool_call("call-1", "retriever_tool", "{not json")];
        let results = agent.execute_calls(&calls).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("Invalid JSON arguments"));
        // The tool itself was never reached.
        assert_eq!(tool.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_arguments_default_to_empty_object() {
        let model = ScriptedModel::new([]);
        let tool = StaticTool::new("get_current_date", "2026-08-06");
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone());
        let agent = Agent::booking(model, Arc::new(registry));

        let calls = vec![tool_call("call-1", "get_current_date", "")];
        let results = agent.execute_calls(&calls).await.unwrap();
        assert_eq!(results[0].content, "2026-08-06");
        assert_eq!(tool.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invoke_prepends_system_prompt() {
        // The scripted model ignores its input, so this just exercises the
        // call path end to end.
        let model = ScriptedModel::new([AssistantTurn::text("final answer")]);
        let agent = rag_agent(model, StaticTool::new("retriever_tool", "x"));

        let history = vec![Message::user("What are your hours?")];
        let turn = agent.invoke(&history, &[]).await.unwrap();
        assert_eq!(turn.content, "final answer");
        assert!(!turn.has_tool_calls());
    }
}
