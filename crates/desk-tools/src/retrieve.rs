use async_trait::async_trait;
use desk_core::error::DeskError;
use desk_core::retrieval::VectorIndex;
use desk_core::tool_registry::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Sentinel returned when retrieval finds nothing. Never an empty string —
/// the model needs something to ground its "I don't know" on.
const NO_RESULTS: &str = "No relevant information found.";

/// Semantic retrieval over the indexed gym documents.
pub struct RetrieverTool {
    index: Arc<VectorIndex>,
}

impl RetrieverTool {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        "retriever_tool"
    }

    fn description(&self) -> &str {
        "Search and return information from the strength and conditioning gym documents."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, DeskError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
        }
        let args: Args = serde_json::from_value(args).map_err(|e| DeskError::ToolExecution {
            tool_name: self.name().into(),
            message: format!("Invalid arguments: {}", e),
        })?;

        let passages = self.index.search(&args.query).await?;
        Ok(format_passages(&passages))
    }
}

/// Concatenate retrieved passages with position labels.
pub(crate) fn format_passages(passages: &[String]) -> String {
    if passages.is_empty() {
        return NO_RESULTS.to_string();
    }
    passages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("Document {}:\n{}\n", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_core::retrieval::Embedder;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DeskError> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("hours") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[test]
    fn test_passages_get_position_labels() {
        let text = format_passages(&[
            "Open 6am-10pm weekdays.".to_string(),
            "Closed on public holidays.".to_string(),
        ]);
        assert!(text.starts_with("Document 1:\nOpen 6am-10pm weekdays."));
        assert!(text.contains("Document 2:\nClosed on public holidays."));
    }

    #[test]
    fn test_no_hits_returns_sentinel() {
        assert_eq!(format_passages(&[]), NO_RESULTS);
    }

    #[tokio::test]
    async fn test_empty_index_yields_sentinel() {
        let index = Arc::new(VectorIndex::empty(Arc::new(StubEmbedder), 5));
        let tool = RetrieverTool::new(index);

        let out = tool
            .execute(json!({ "query": "what are your hours?" }))
            .await
            .unwrap();
        assert_eq!(out, NO_RESULTS);
    }

    #[tokio::test]
    async fn test_query_returns_ranked_passages() {
        let index = VectorIndex::build(
            Arc::new(StubEmbedder),
            5,
            vec![
                "Our opening hours are 6am to 10pm.".to_string(),
                "Monthly membership is $49.".to_string(),
            ],
        )
        .await
        .unwrap();
        let tool = RetrieverTool::new(Arc::new(index));

        let out = tool.execute(json!({ "query": "hours" })).await.unwrap();
        assert!(out.starts_with("Document 1:\nOur opening hours"));
    }

    #[tokio::test]
    async fn test_missing_query_is_invalid_arguments() {
        let index = Arc::new(VectorIndex::empty(Arc::new(StubEmbedder), 5));
        let tool = RetrieverTool::new(index);

        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, DeskError::ToolExecution { .. }));
    }
}
