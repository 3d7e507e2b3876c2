use crate::agent::Agent;
use crate::error::DeskError;
use crate::router::{FrontDesk, RouterDecision};
use crate::types::{AgentKind, Intent, Message, ToolCall};
use tracing::{debug, warn};

/// Upper bound on agent-turn rounds within one user turn. A round is one
/// model invocation; tool execution between rounds does not count. Keeps a
/// pathological model from ping-ponging with the tool executor forever.
const MAX_TOOL_ROUNDS: usize = 8;

/// Reply surfaced when the round cap is hit.
const ROUND_CAP_REPLY: &str =
    "I wasn't able to complete that request. Please try rephrasing it.";

/// Everything produced by one pass through the graph.
#[derive(Debug)]
pub struct Turn {
    pub intent: Intent,
    /// Messages generated this turn, in order, ending with the final
    /// assistant answer. The caller appends them to the session on success
    /// and discards them on failure.
    pub messages: Vec<Message>,
}

impl Turn {
    /// The final assistant reply of this turn.
    pub fn reply(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::types::Role::Assistant && m.tool_calls.is_none())
    }
}

/// Per-turn state machine phase.
enum Phase {
    Routing,
    AgentTurn(AgentKind),
    ToolExec(AgentKind, Vec<ToolCall>),
    Done,
}

/// The fixed conversation graph: the front desk is the single entry point;
/// its outgoing edges lead to a terminal direct response or into one of the
/// two agent ⇄ tool-execution loops, each of which terminates when the agent
/// emits a turn with no tool calls.
pub struct ConversationGraph {
    front_desk: FrontDesk,
    rag: Agent,
    booking: Agent,
}

impl ConversationGraph {
    pub fn new(front_desk: FrontDesk, rag: Agent, booking: Agent) -> Self {
        Self {
            front_desk,
            rag,
            booking,
        }
    }

    fn agent(&self, kind: AgentKind) -> &Agent {
        match kind {
            AgentKind::Rag => &self.rag,
            AgentKind::Booking => &self.booking,
        }
    }

    /// Run one user turn through the graph. `history` must already end with
    /// the latest user message; it is never mutated here.
    pub async fn run_turn(&self, history: &[Message]) -> Result<Turn, DeskError> {
        let mut produced: Vec<Message> = Vec::new();
        let mut intent = Intent::DirectResponse;
        let mut rounds = 0;
        let mut phase = Phase::Routing;

        loop {
            phase = match phase {
                Phase::Routing => match self.front_desk.classify(history).await? {
                    RouterDecision::Direct(reply) => {
                        produced.push(reply);
                        Phase::Done
                    }
                    RouterDecision::Handoff(kind) => {
                        debug!(agent = kind.label(), "handing off");
                        intent = Intent::Handoff(kind);
                        Phase::AgentTurn(kind)
                    }
                },

                Phase::AgentTurn(kind) => {
                    rounds += 1;
                    if rounds > MAX_TOOL_ROUNDS {
                        warn!(
                            agent = self.agent(kind).name(),
                            "hit max tool rounds ({}), ending turn", MAX_TOOL_ROUNDS
                        );
                        produced.push(Message::assistant(ROUND_CAP_REPLY));
                        Phase::Done
                    } else {
                        let turn = self.agent(kind).invoke(history, &produced).await?;
                        if turn.has_tool_calls() {
                            let calls = turn.tool_calls.clone();
                            produced
                                .push(Message::assistant_with_tool_calls(turn.content, turn.tool_calls));
                            Phase::ToolExec(kind, calls)
                        } else {
                            produced.push(Message::assistant(turn.content));
                            Phase::Done
                        }
                    }
                }

                Phase::ToolExec(kind, calls) => {
                    let results = self.agent(kind).execute_calls(&calls).await?;
                    produced.extend(results);
                    Phase::AgentTurn(kind)
                }

                Phase::Done => {
                    return Ok(Turn {
                        intent,
                        messages: produced,
                    })
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tool_call, turn_with_calls, ScriptedModel, StaticTool};
    use crate::tool_registry::ToolRegistry;
    use crate::types::{AssistantTurn, Role};
    use std::sync::Arc;

    struct Fixture {
        graph: ConversationGraph,
        retriever: Arc<StaticTool>,
        date: Arc<StaticTool>,
        book: Arc<StaticTool>,
        cancel: Arc<StaticTool>,
    }

    /// Wire a graph from scripted model turns. The router consumes the first
    /// script; each agent gets its own.
    fn fixture(
        router_turns: Vec<AssistantTurn>,
        rag_turns: Vec<AssistantTurn>,
        booking_turns: Vec<AssistantTurn>,
    ) -> Fixture {
        let retriever = StaticTool::new(
            "retriever_tool",
            "Document 1:\nThe gym is open 6am-10pm on weekdays.",
        );
        let date = StaticTool::new("get_current_date", "2026-08-06");
        let book = StaticTool::new(
            "book_class",
            "Successfully booked 'yoga' on 2026-08-07 for member 42. Confirmation ID: 17",
        );
        let cancel = StaticTool::new("cancel_booking", "Successfully cancelled booking 17 for member 42.");

        let mut rag_tools = ToolRegistry::new();
        rag_tools.register(retriever.clone());
        let mut booking_tools = ToolRegistry::new();
        booking_tools.register(date.clone());
        booking_tools.register(book.clone());
        booking_tools.register(cancel.clone());

        let graph = ConversationGraph::new(
            FrontDesk::new(ScriptedModel::new(router_turns)),
            Agent::rag(ScriptedModel::new(rag_turns), Arc::new(rag_tools)),
            Agent::booking(ScriptedModel::new(booking_turns), Arc::new(booking_tools)),
        );

        Fixture {
            graph,
            retriever,
            date,
            book,
            cancel,
        }
    }

    #[tokio::test]
    async fn test_greeting_is_direct_response() {
        let fx = fixture(
            vec![AssistantTurn::text("Hello! Welcome to our gym.")],
            vec![],
            vec![],
        );

        let history = vec![Message::user("Hi!")];
        let turn = fx.graph.run_turn(&history).await.unwrap();

        assert_eq!(turn.intent, Intent::DirectResponse);
        assert_eq!(turn.messages.len(), 1);
        assert_eq!(turn.messages[0].content, "Hello! Welcome to our gym.");
        assert_eq!(fx.retriever.call_count(), 0);
        assert_eq!(fx.date.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rag_handoff_runs_retrieval_loop() {
        let fx = fixture(
            vec![AssistantTurn::text("RAGAgent")],
            vec![
                turn_with_calls(vec![tool_call(
                    "call-1",
                    "retriever_tool",
                    r#"{"query":"operating hours"}"#,
                )]),
                AssistantTurn::text("We're open 6am-10pm on weekdays."),
            ],
            vec![],
        );

        let history = vec![Message::user("What are your hours?")];
        let turn = fx.graph.run_turn(&history).await.unwrap();

        assert_eq!(turn.intent, Intent::Handoff(AgentKind::Rag));
        assert_eq!(fx.retriever.call_count(), 1);

        // assistant-with-calls, tool result, final answer — in that order.
        let roles: Vec<Role> = turn.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::Tool, Role::Assistant]);
        assert_eq!(turn.messages[1].tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(
            turn.reply().unwrap().content,
            "We're open 6am-10pm on weekdays."
        );
    }

    #[tokio::test]
    async fn test_booking_resolves_date_before_booking() {
        let fx = fixture(
            vec![AssistantTurn::text("BookingAgent")],
            vec![],
            vec![
                turn_with_calls(vec![tool_call("call-1", "get_current_date", "{}")]),
                turn_with_calls(vec![tool_call(
                    "call-2",
                    "book_class",
                    r#"{"member_id":"42","class_name":"yoga","date":"2026-08-07"}"#,
                )]),
                AssistantTurn::text("Booked yoga for 2026-08-07. Booking ID: 17."),
            ],
        );

        let history = vec![Message::user("Book me Yoga for tomorrow, member id 42")];
        let turn = fx.graph.run_turn(&history).await.unwrap();

        assert_eq!(turn.intent, Intent::Handoff(AgentKind::Booking));
        assert_eq!(fx.date.call_count(), 1);
        assert_eq!(fx.book.call_count(), 1);

        // Date round first, then the booking round, then the confirmation.
        let roles: Vec<Role> = turn.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Assistant,
                Role::Tool,
                Role::Assistant,
                Role::Tool,
                Role::Assistant
            ]
        );
        assert!(turn.reply().unwrap().content.contains("Booking ID: 17"));
    }

    #[tokio::test]
    async fn test_cancellation_without_confirmation_never_cancels() {
        // The agent follows its prompt: with both ids present it must ask
        // for confirmation instead of calling the tool.
        let fx = fixture(
            vec![AssistantTurn::text("BookingAgent")],
            vec![],
            vec![AssistantTurn::text(
                "Are you sure? Reply \"yes\" to confirm cancelling booking 17.",
            )],
        );

        let history = vec![Message::user("Cancel booking 17, member id 42")];
        let turn = fx.graph.run_turn(&history).await.unwrap();

        assert_eq!(fx.cancel.call_count(), 0);
        assert!(turn.reply().unwrap().content.contains("Are you sure?"));
    }

    #[tokio::test]
    async fn test_round_cap_surfaces_could_not_complete() {
        // The booking model asks for the date on every round and never stops.
        let endless: Vec<AssistantTurn> = (0..MAX_TOOL_ROUNDS + 1)
            .map(|i| {
                turn_with_calls(vec![tool_call(
                    &format!("call-{}", i),
                    "get_current_date",
                    "{}",
                )])
            })
            .collect();
        let fx = fixture(vec![AssistantTurn::text("BookingAgent")], vec![], endless);

        let history = vec![Message::user("Book me something")];
        let turn = fx.graph.run_turn(&history).await.unwrap();

        assert_eq!(fx.date.call_count(), MAX_TOOL_ROUNDS);
        assert_eq!(turn.reply().unwrap().content, ROUND_CAP_REPLY);
    }

    #[tokio::test]
    async fn test_tool_results_match_preceding_assistant_calls() {
        let fx = fixture(
            vec![AssistantTurn::text("RAGAgent")],
            vec![
                turn_with_calls(vec![
                    tool_call("call-1", "retriever_tool", r#"{"query":"a"}"#),
                    tool_call("call-2", "retriever_tool", r#"{"query":"b"}"#),
                ]),
                AssistantTurn::text("done"),
            ],
            vec![],
        );

        let history = vec![Message::user("Tell me about classes and pricing")];
        let turn = fx.graph.run_turn(&history).await.unwrap();

        // Every tool result references an id from the immediately preceding
        // assistant message.
        let calls: Vec<String> = turn.messages[0]
            .tool_calls
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        let results: Vec<String> = turn.messages[1..3]
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(calls, results);
    }

    #[tokio::test]
    async fn test_router_failure_produces_no_messages() {
        // An exhausted script behaves like a provider failure.
        let fx = fixture(vec![], vec![], vec![]);
        let history = vec![Message::user("Hi!")];
        let err = fx.graph.run_turn(&history).await.unwrap_err();
        assert!(matches!(err, DeskError::Provider(_)));
    }
}
