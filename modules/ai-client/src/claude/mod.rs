mod client;
pub(crate) mod types;

use anyhow::{anyhow, Context, Result};

use crate::schema::StructuredOutput;
use client::{ClaudeClient, ANTHROPIC_API_URL};
use types::*;

const STRUCTURED_TOOL: &str = "structured_response";

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    temperature: Option<f32>,
    max_tokens: u32,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            temperature: None,
            max_tokens: 4096,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> Result<ClaudeClient> {
        ClaudeClient::new(
            &self.api_key,
            self.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL),
        )
    }

    /// Force a tool call whose input schema is `T`'s, and decode the tool input.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let request = ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(WireMessage::user(user_prompt))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .forced_tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL.to_string(),
                description: format!("Record the {} extracted from the input.", T::type_name()),
                input_schema: T::tool_schema(),
            });

        let response = self.client()?.chat(&request).await?;

        let input = response.tool_input(STRUCTURED_TOOL).ok_or_else(|| {
            anyhow!(
                "No structured output in Claude response (stop_reason {:?}): {}",
                response.stop_reason,
                response.text().unwrap_or_default()
            )
        })?;

        serde_json::from_value(input.clone())
            .with_context(|| format!("Failed to deserialize {}", T::type_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Grade {
        letter: String,
        grade: i64,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_claude_new() {
        let ai = Claude::new("sk-ant-test", "claude-3-haiku-20240307");
        assert_eq!(ai.model(), "claude-3-haiku-20240307");
        assert_eq!(ai.max_tokens, 4096);
        assert!(ai.temperature.is_none());
    }

    #[test]
    fn forced_tool_request_shape() {
        let request = ChatRequest::new("m")
            .system("sys")
            .message(WireMessage::user("hi"))
            .temperature(Some(0.1))
            .forced_tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL.into(),
                description: "d".into(),
                input_schema: Grade::tool_schema(),
            });
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["tool_choice"], json!({"type": "tool", "name": STRUCTURED_TOOL}));
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[tokio::test]
    async fn extract_decodes_tool_input() {
        let router = Router::new().route(
            "/messages",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["tool_choice"]["name"], STRUCTURED_TOOL);
                Json(json!({
                    "content": [
                        {"type": "text", "text": "Here you go"},
                        {"type": "tool_use", "id": "t1", "name": STRUCTURED_TOOL,
                         "input": {"letter": "A", "grade": 4}}
                    ],
                    "stop_reason": "tool_use"
                }))
            }),
        );
        let base = serve(router).await;

        let ai = Claude::new("sk-ant-test", "m").with_base_url(base);
        let grade: Grade = ai.extract("system", "user").await.unwrap();
        assert_eq!(grade, Grade { letter: "A".into(), grade: 4 });
    }

    #[tokio::test]
    async fn extract_without_tool_use_is_an_error() {
        let router = Router::new().route(
            "/messages",
            post(|| async { Json(json!({"content": [{"type": "text", "text": "no"}]})) }),
        );
        let base = serve(router).await;

        let ai = Claude::new("sk-ant-test", "m").with_base_url(base);
        let err = ai.extract::<Grade>("system", "user").await.unwrap_err();
        assert!(err.to_string().contains("No structured output"), "{err}");
        assert!(err.to_string().ends_with(": no"), "{err}");
    }

    #[tokio::test]
    async fn api_errors_carry_status() {
        let router = Router::new().route(
            "/messages",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(router).await;

        let ai = Claude::new("sk-ant-test", "m").with_base_url(base);
        let err = ai.extract::<Grade>("s", "u").await.unwrap_err();
        assert!(err.to_string().contains("429"), "{err}");
    }
}
