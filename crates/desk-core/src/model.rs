use crate::config::ProviderConfig;
use crate::error::DeskError;
use crate::types::{AssistantTurn, Message, Role, ToolCall, ToolSchema};

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionToolArgs, ChatCompletionToolType, CreateChatCompletionRequestArgs,
    FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;

/// Upper bound on a single completion request.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// A chat model that can be invoked with conversation history and a set of
/// declared tools. The seam exists so the router, agents, and graph can be
/// exercised with scripted models in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<AssistantTurn, DeskError>;
}

/// Chat model backed by an OpenAI-compatible chat completions API.
pub struct OpenAiChat {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChat {
    pub fn new(provider: &ProviderConfig, api_key: &str, temperature: f32) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(&provider.api_base)
            .with_api_key(api_key);
        Self {
            client: Client::with_config(openai_config),
            model: provider.model.clone(),
            temperature,
            max_tokens: provider.max_tokens,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<AssistantTurn, DeskError> {
        let request_messages = build_request_messages(messages)?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder
            .model(&self.model)
            .messages(request_messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);

        if !tools.is_empty() {
            let tools: Vec<_> = tools
                .iter()
                .map(|s| {
                    let func = FunctionObjectArgs::default()
                        .name(&s.name)
                        .description(&s.description)
                        .parameters(s.parameters.clone())
                        .build()
                        .map_err(|e| {
                            DeskError::Provider(format!("function '{}': {}", s.name, e))
                        })?;
                    ChatCompletionToolArgs::default()
                        .r#type(ChatCompletionToolType::Function)
                        .function(func)
                        .build()
                        .map_err(|e| DeskError::Provider(format!("tool '{}': {}", s.name, e)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            request_builder.tools(tools);
        }

        let request = request_builder
            .build()
            .map_err(|e| DeskError::Provider(e.to_string()))?;

        let response = tokio::time::timeout(COMPLETION_TIMEOUT, self.client.chat().create(request))
            .await
            .map_err(|_| DeskError::Provider("Completion request timed out".into()))?
            .map_err(|e| DeskError::Provider(e.to_string()))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| DeskError::Provider("No choices in response".into()))?;

        let content = choice.message.content.clone().unwrap_or_default();
        let tool_calls = choice
            .message
            .tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|tc| ToolCall {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                arguments: tc.function.arguments.clone(),
            })
            .collect();

        Ok(AssistantTurn { content, tool_calls })
    }
}

/// Convert our Message types to async-openai request messages.
fn build_request_messages(
    messages: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>, DeskError> {
    let mut result = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => {
                let m = ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content.as_str())
                    .build()
                    .map_err(|e| DeskError::Provider(e.to_string()))?;
                result.push(ChatCompletionRequestMessage::System(m));
            }
            Role::User => {
                let m = ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.as_str())
                    .build()
                    .map_err(|e| DeskError::Provider(e.to_string()))?;
                result.push(ChatCompletionRequestMessage::User(m));
            }
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                builder.content(msg.content.as_str());
                if let Some(tool_calls) = &msg.tool_calls {
                    let tc_openai: Vec<ChatCompletionMessageToolCall> = tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: async_openai::types::FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect();
                    builder.tool_calls(tc_openai);
                }
                let m = builder
                    .build()
                    .map_err(|e| DeskError::Provider(e.to_string()))?;
                result.push(ChatCompletionRequestMessage::Assistant(m));
            }
            Role::Tool => {
                let m = ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(msg.tool_call_id.as_deref().unwrap_or(""))
                    .content(msg.content.as_str())
                    .build()
                    .map_err(|e| DeskError::Provider(e.to_string()))?;
                result.push(ChatCompletionRequestMessage::Tool(m));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_messages_preserve_roles_and_order() {
        let messages = vec![
            Message::system("prompt"),
            Message::user("hi"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "call-1".into(),
                    name: "get_current_date".into(),
                    arguments: "{}".into(),
                }],
            ),
            Message::tool_result("call-1", "2026-08-06"),
            Message::assistant("done"),
        ];

        let built = build_request_messages(&messages).unwrap();
        assert_eq!(built.len(), 5);
        assert!(matches!(built[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(built[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(built[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(built[3], ChatCompletionRequestMessage::Tool(_)));
        assert!(matches!(built[4], ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_tool_result_carries_call_id() {
        let messages = vec![Message::tool_result("call-9", "ok")];
        let built = build_request_messages(&messages).unwrap();
        match &built[0] {
            ChatCompletionRequestMessage::Tool(m) => assert_eq!(m.tool_call_id, "call-9"),
            other => panic!("expected tool message, got {:?}", other),
        }
    }
}
