//! Scripted fakes shared by the router, agent, and graph tests.

use crate::error::DeskError;
use crate::model::ChatModel;
use crate::tool_registry::Tool;
use crate::types::{AssistantTurn, Message, ToolCall, ToolSchema};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Chat model that replays a fixed sequence of turns.
pub(crate) struct ScriptedModel {
    turns: Mutex<VecDeque<AssistantTurn>>,
}

impl ScriptedModel {
    pub fn new(turns: impl IntoIterator<Item = AssistantTurn>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns.into_iter().collect()),
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolSchema],
    ) -> Result<AssistantTurn, DeskError> {
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DeskError::Provider("scripted model ran out of turns".into()))
    }
}

/// Tool that returns a fixed reply and counts invocations.
pub(crate) struct StaticTool {
    name: &'static str,
    reply: &'static str,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticTool {
    pub fn new(name: &'static str, reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    /// A tool whose execution always fails with the given message.
    pub fn failing(name: &'static str, message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: message,
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<String, DeskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(DeskError::ToolExecution {
                tool_name: self.name.to_string(),
                message: self.reply.to_string(),
            })
        } else {
            Ok(self.reply.to_string())
        }
    }
}

/// Shorthand for building a tool call in a scripted turn.
pub(crate) fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// Shorthand for a scripted assistant turn that requests tool calls.
pub(crate) fn turn_with_calls(calls: Vec<ToolCall>) -> AssistantTurn {
    AssistantTurn {
        content: String::new(),
        tool_calls: calls,
    }
}
