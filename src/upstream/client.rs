//! Upstream MCP client (C2).
//!
//! Every call opens its own SSE session against the upstream, issues the
//! request, waits for the matching response event, and closes the session.
//! No session is held open between invocations: this keeps the aggregator
//! from needing to track upstream liveness between calls, at the cost of one
//! extra round trip per invocation.

use futures::StreamExt;
use serde_json::{json, Value};
use url::Url;

use crate::error::{AggregatorError, AggregatorResult};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PromptCapability, ResourceCapability, ToolCapability};

/// An HTTP client scoped to a single upstream MCP server's URL.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
}

/// One `field: value` line parsed out of an SSE frame.
#[derive(Debug, Default)]
struct SseFrame {
    event: Option<String>,
    data: String,
}

impl SseFrame {
    fn parse(raw: &str) -> Self {
        let mut frame = SseFrame::default();
        let mut data_lines = Vec::new();
        for line in raw.lines() {
            if let Some(value) = line.strip_prefix("event:") {
                frame.event = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                data_lines.push(value.trim_start().to_string());
            }
        }
        frame.data = data_lines.join("\n");
        frame
    }
}

impl UpstreamClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Open an SSE session, wait for the `endpoint` event, issue `request`
    /// against the advertised POST URL, and return the first response event
    /// whose `id` matches. The session is dropped (and with it, the
    /// underlying connection) once this returns.
    async fn invoke(&self, request: JsonRpcRequest) -> AggregatorResult<Value> {
        let response = self
            .http
            .get(self.base_url.clone())
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| AggregatorError::upstream_connect(self.base_url.to_string(), e.to_string()))?;

        if !response.status().is_success() {
            return Err(AggregatorError::upstream_connect(
                self.base_url.to_string(),
                format!("unexpected status {}", response.status()),
            ));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut post_url: Option<Url> = None;

        while post_url.is_none() {
            let chunk = stream.next().await.ok_or_else(|| {
                AggregatorError::upstream_connect(
                    self.base_url.to_string(),
                    "stream closed before endpoint event".to_string(),
                )
            })?;
            let chunk = chunk.map_err(AggregatorError::Http)?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let raw_frame: String = buffer.drain(..pos + 2).collect();
                let frame = SseFrame::parse(&raw_frame);
                if frame.event.as_deref() == Some("endpoint") {
                    post_url = Some(self.resolve_endpoint(&frame.data)?);
                    break;
                }
            }
        }
        let post_url = post_url.expect("loop only exits once post_url is set");

        let expected_id = request.id.clone();
        self.http
            .post(post_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AggregatorError::upstream_invocation(self.base_url.to_string(), e.to_string()))?;

        loop {
            let chunk = stream.next().await.ok_or_else(|| {
                AggregatorError::upstream_invocation(
                    self.base_url.to_string(),
                    "stream closed before response".to_string(),
                )
            })?;
            let chunk = chunk.map_err(AggregatorError::Http)?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let raw_frame: String = buffer.drain(..pos + 2).collect();
                let frame = SseFrame::parse(&raw_frame);
                if frame.data.is_empty() {
                    continue;
                }
                let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&frame.data) else {
                    continue;
                };
                if Some(&resp.id) != expected_id.as_ref() {
                    continue;
                }
                return match resp.error {
                    None => Ok(resp.result.unwrap_or(Value::Null)),
                    Some(err) => Err(AggregatorError::upstream_invocation(
                        self.base_url.to_string(),
                        err.message,
                    )),
                };
            }
        }
    }

    /// The `endpoint` event's data is a URL, either absolute or relative to
    /// the upstream's SSE origin.
    fn resolve_endpoint(&self, data: &str) -> AggregatorResult<Url> {
        match Url::parse(data) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.base_url.join(data).map_err(AggregatorError::from)
            }
            Err(e) => Err(AggregatorError::from(e)),
        }
    }

    pub async fn list_tools(&self) -> AggregatorResult<Vec<ToolCapability>> {
        let result = self
            .invoke(JsonRpcRequest::new(json!(1), "tools/list", None))
            .await?;
        let tools = result
            .get("tools")
            .cloned()
            .ok_or_else(|| AggregatorError::Protocol("tools/list response missing 'tools'".into()))?;
        Ok(serde_json::from_value(tools)?)
    }

    pub async fn list_resources(&self) -> AggregatorResult<Vec<ResourceCapability>> {
        let result = self
            .invoke(JsonRpcRequest::new(json!(1), "resources/list", None))
            .await?;
        let resources = result.get("resources").cloned().ok_or_else(|| {
            AggregatorError::Protocol("resources/list response missing 'resources'".into())
        })?;
        Ok(serde_json::from_value(resources)?)
    }

    pub async fn list_prompts(&self) -> AggregatorResult<Vec<PromptCapability>> {
        let result = self
            .invoke(JsonRpcRequest::new(json!(1), "prompts/list", None))
            .await?;
        let prompts = result
            .get("prompts")
            .cloned()
            .ok_or_else(|| AggregatorError::Protocol("prompts/list response missing 'prompts'".into()))?;
        Ok(serde_json::from_value(prompts)?)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> AggregatorResult<Value> {
        let params = json!({ "name": name, "arguments": arguments });
        self.invoke(JsonRpcRequest::new(json!(1), "tools/call", Some(params)))
            .await
    }

    pub async fn read_resource(&self, uri: &str) -> AggregatorResult<Value> {
        let params = json!({ "uri": uri });
        self.invoke(JsonRpcRequest::new(json!(1), "resources/read", Some(params)))
            .await
    }

    pub async fn get_prompt(&self, name: &str, arguments: Value) -> AggregatorResult<Value> {
        let params = json!({ "name": name, "arguments": arguments });
        self.invoke(JsonRpcRequest::new(json!(1), "prompts/get", Some(params)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_frame_parses_event_and_data() {
        let raw = "event: endpoint\ndata: /messages?sessionId=abc\n\n";
        let frame = SseFrame::parse(raw);
        assert_eq!(frame.event.as_deref(), Some("endpoint"));
        assert_eq!(frame.data, "/messages?sessionId=abc");
    }

    #[test]
    fn sse_frame_joins_multiline_data() {
        let raw = "event: message\ndata: {\"a\":1,\ndata: \"b\":2}\n\n";
        let frame = SseFrame::parse(raw);
        assert_eq!(frame.data, "{\"a\":1,\n\"b\":2}");
    }

    #[test]
    fn resolve_endpoint_joins_relative_path() {
        let client = UpstreamClient::new(Url::parse("https://upstream.example.com/sse").unwrap());
        let resolved = client.resolve_endpoint("/messages?sessionId=abc").unwrap();
        assert_eq!(resolved.as_str(), "https://upstream.example.com/messages?sessionId=abc");
    }

    #[test]
    fn resolve_endpoint_keeps_absolute_url() {
        let client = UpstreamClient::new(Url::parse("https://upstream.example.com/sse").unwrap());
        let resolved = client
            .resolve_endpoint("https://other.example.com/messages?sessionId=abc")
            .unwrap();
        assert_eq!(resolved.host_str(), Some("other.example.com"));
    }
}
