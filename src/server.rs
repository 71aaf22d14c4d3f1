//! Exposed server (C4): the single federated MCP endpoint clients see.
//!
//! Every method dispatch looks up which upstream currently owns the named
//! capability and forwards to it, rather than forwarding unconditionally to
//! a single fixed backend.

use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{AggregatorError, AggregatorResult};
use crate::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, PromptCapability, ResourceCapability, ServerInfo,
    ToolCapability,
};
use crate::registry::CapabilityRegistry;
use crate::upstream::UpstreamClient;

/// The MCP protocol version this aggregator speaks to downstream clients.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Owns the three capability tables (tools/resources/prompts), each mapping
/// a capability name to the upstream key that currently serves it, plus the
/// live [`UpstreamClient`] for each registered upstream.
pub struct ExposedServer {
    info: ServerInfo,
    registry: Arc<CapabilityRegistry>,
    tools: DashMap<String, ToolCapability>,
    tool_owners: DashMap<String, String>,
    resources: DashMap<String, ResourceCapability>,
    resource_owners: DashMap<String, String>,
    prompts: DashMap<String, PromptCapability>,
    prompt_owners: DashMap<String, String>,
    clients: DashMap<String, UpstreamClient>,
}

impl ExposedServer {
    pub fn new(info: ServerInfo, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            info,
            registry,
            tools: DashMap::new(),
            tool_owners: DashMap::new(),
            resources: DashMap::new(),
            resource_owners: DashMap::new(),
            prompts: DashMap::new(),
            prompt_owners: DashMap::new(),
            clients: DashMap::new(),
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn install_client(&self, upstream_key: String, client: UpstreamClient) {
        self.clients.insert(upstream_key, client);
    }

    pub fn install_tool(&self, upstream_key: &str, tool: ToolCapability) {
        self.tool_owners.insert(tool.name.clone(), upstream_key.to_string());
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn install_resource(&self, upstream_key: &str, resource: ResourceCapability) {
        self.resource_owners
            .insert(resource.uri.clone(), upstream_key.to_string());
        self.resources.insert(resource.uri.clone(), resource);
    }

    pub fn install_prompt(&self, upstream_key: &str, prompt: PromptCapability) {
        self.prompt_owners
            .insert(prompt.name.clone(), upstream_key.to_string());
        self.prompts.insert(prompt.name.clone(), prompt);
    }

    /// Drop the live client for an upstream that's been lost. Capability
    /// tables are left untouched: a handler stays installed and fails with
    /// `ClientNotFound` until the upstream is reconnected, rather than
    /// vanishing from `tools/list`.
    pub fn remove_upstream(&self, upstream_key: &str) {
        self.clients.remove(upstream_key);
    }

    fn client_for(&self, upstream_key: &str) -> Option<UpstreamClient> {
        self.clients.get(upstream_key).map(|c| c.value().clone())
    }

    /// Dispatch a JSON-RPC request and produce its response. Never returns
    /// an `Err`: protocol and forwarding failures are encoded as JSON-RPC
    /// error responses, matching the profile clients expect. The second
    /// element names the upstream a forwarded call found unreachable, if
    /// any — callers use it to feed loss detection back into the composer's
    /// reconnect loop.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> (JsonRpcResponse, Option<String>) {
        let id = request.id.clone().unwrap_or(Value::Null);
        match self.handle(&request).await {
            Ok(result) => (JsonRpcResponse::success(id, result), None),
            Err(ForwardError { error, upstream_key }) => {
                let lost = upstream_key.filter(|_| error.is_retryable());
                let response = JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, error.sanitize()),
                );
                (response, lost)
            }
        }
    }

    async fn handle(&self, request: &JsonRpcRequest) -> Result<Value, ForwardError> {
        match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "serverInfo": { "name": self.info.name, "version": self.info.version },
                "capabilities": { "tools": {}, "resources": {}, "prompts": {} },
            })),
            "tools/list" => Ok(json!({ "tools": self.list_tools() })),
            "tools/call" => self.call_tool(request).await,
            "resources/list" => Ok(json!({ "resources": self.list_resources() })),
            "resources/read" => self.read_resource(request).await,
            "prompts/list" => Ok(json!({ "prompts": self.list_prompts() })),
            "prompts/get" => self.get_prompt(request).await,
            other => Err(AggregatorError::Protocol(format!("unknown method '{other}'")).into()),
        }
    }

    fn list_tools(&self) -> Vec<ToolCapability> {
        self.tools.iter().map(|e| e.value().clone()).collect()
    }

    fn list_resources(&self) -> Vec<ResourceCapability> {
        self.resources.iter().map(|e| e.value().clone()).collect()
    }

    fn list_prompts(&self) -> Vec<PromptCapability> {
        self.prompts.iter().map(|e| e.value().clone()).collect()
    }

    async fn call_tool(&self, request: &JsonRpcRequest) -> Result<Value, ForwardError> {
        let params = request
            .params
            .as_ref()
            .ok_or_else(|| AggregatorError::Protocol("tools/call missing params".into()))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AggregatorError::Protocol("tools/call missing 'name'".into()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        let (upstream_key, client) = self.owning_client(&self.tool_owners, name)?;
        client
            .call_tool(name, arguments)
            .await
            .map_err(|error| ForwardError { error, upstream_key: Some(upstream_key) })
    }

    async fn read_resource(&self, request: &JsonRpcRequest) -> Result<Value, ForwardError> {
        let params = request
            .params
            .as_ref()
            .ok_or_else(|| AggregatorError::Protocol("resources/read missing params".into()))?;
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| AggregatorError::Protocol("resources/read missing 'uri'".into()))?;
        let (upstream_key, client) = self.owning_client(&self.resource_owners, uri)?;
        client
            .read_resource(uri)
            .await
            .map_err(|error| ForwardError { error, upstream_key: Some(upstream_key) })
    }

    async fn get_prompt(&self, request: &JsonRpcRequest) -> Result<Value, ForwardError> {
        let params = request
            .params
            .as_ref()
            .ok_or_else(|| AggregatorError::Protocol("prompts/get missing params".into()))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AggregatorError::Protocol("prompts/get missing 'name'".into()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        let (upstream_key, client) = self.owning_client(&self.prompt_owners, name)?;
        client
            .get_prompt(name, arguments)
            .await
            .map_err(|error| ForwardError { error, upstream_key: Some(upstream_key) })
    }

    /// Resolve a capability name to its owning upstream key and live client.
    /// Both come back together because a forwarding failure on the returned
    /// client needs the key to report which upstream was lost.
    fn owning_client(
        &self,
        owners: &DashMap<String, String>,
        capability_name: &str,
    ) -> AggregatorResult<(String, UpstreamClient)> {
        let upstream_key = owners
            .get(capability_name)
            .map(|e| e.value().clone())
            .ok_or_else(|| AggregatorError::ClientNotFound(capability_name.to_string()))?;
        let client = self
            .client_for(&upstream_key)
            .ok_or_else(|| AggregatorError::ClientNotFound(capability_name.to_string()))?;
        Ok((upstream_key, client))
    }
}

/// A dispatch failure, carrying the upstream key responsible when the
/// failure originated from forwarding a call (as opposed to malformed
/// request parameters or an unknown method).
struct ForwardError {
    error: AggregatorError,
    upstream_key: Option<String>,
}

impl From<AggregatorError> for ForwardError {
    fn from(error: AggregatorError) -> Self {
        Self { error, upstream_key: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerInfo;
    use serde_json::json;

    fn server() -> ExposedServer {
        ExposedServer::new(
            ServerInfo { name: "mcgravity".to_string(), version: "1.0.0".to_string() },
            Arc::new(CapabilityRegistry::new()),
        )
    }

    #[tokio::test]
    async fn tools_list_reflects_installed_tools() {
        let server = server();
        server.install_tool(
            "https://a.example.com/sse",
            ToolCapability { name: "echo".to_string(), description: None, input_schema: json!({}) },
        );
        let (resp, lost) = server
            .dispatch(JsonRpcRequest::new(json!(1), "tools/list", None))
            .await;
        assert!(lost.is_none());
        let tools = resp.result.unwrap();
        assert_eq!(tools["tools"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn call_to_unregistered_tool_is_client_not_found() {
        let server = server();
        let req = JsonRpcRequest::new(json!(1), "tools/call", Some(json!({"name": "missing", "arguments": {}})));
        let (resp, lost) = server.dispatch(req).await;
        assert!(lost.is_none());
        assert!(resp.error.is_some());
        assert!(resp.error.unwrap().message.contains("missing"));
    }

    #[tokio::test]
    async fn call_to_installed_tool_without_live_client_is_client_not_found() {
        let server = server();
        server.install_tool(
            "https://a.example.com/sse",
            ToolCapability { name: "echo".to_string(), description: None, input_schema: json!({}) },
        );
        // Capability stays listed even though no client was ever installed
        // for it (simulating post-loss state).
        let req = JsonRpcRequest::new(json!(1), "tools/call", Some(json!({"name": "echo", "arguments": {}})));
        let (resp, lost) = server.dispatch(req).await;
        assert!(lost.is_none());
        assert!(resp.error.unwrap().message.contains("echo"));
    }

    #[tokio::test]
    async fn unknown_method_is_protocol_error() {
        let server = server();
        let (resp, lost) = server.dispatch(JsonRpcRequest::new(json!(1), "bogus/method", None)).await;
        assert!(lost.is_none());
        assert!(resp.error.is_some());
    }
}
