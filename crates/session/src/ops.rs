//! Typed client operations, layered thinly over [`Session::call`].
//!
//! Each operation is a fixed method name plus a method-specific params and
//! result shape; none has concurrency logic of its own.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use switchboard_protocol::{
    ExecuteCodeParams, ExecuteOutput, GetFunctionDetailsOutput, GetFunctionDetailsParams,
    ListFunctionsOutput, McpServerSpec, RegisterOutcome,
};
use switchboard_tools::ToolDescriptor;

use crate::error::SessionError;
use crate::session::Session;

impl Session {
    /// List the functions available in the peer's catalog.
    pub async fn list_functions(&self) -> Result<ListFunctionsOutput, SessionError> {
        self.typed_call("list_functions", serde_json::json!({}))
            .await
    }

    /// Fetch full signatures for qualified `Namespace.name` entries.
    pub async fn get_function_details(
        &self,
        functions: Vec<String>,
    ) -> Result<GetFunctionDetailsOutput, SessionError> {
        let params = serde_json::to_value(GetFunctionDetailsParams { functions })?;
        self.typed_call("get_function_details", params).await
    }

    /// Submit code to the remote sandbox with the configured call timeout.
    pub async fn execute(&self, code: impl Into<String>) -> Result<ExecuteOutput, SessionError> {
        self.execute_with_timeout(code, self.config().call_timeout)
            .await
    }

    /// Submit code with an explicit deadline. Long-running code that calls
    /// back into slow local tools needs more room than the default.
    pub async fn execute_with_timeout(
        &self,
        code: impl Into<String>,
        timeout: Duration,
    ) -> Result<ExecuteOutput, SessionError> {
        let params = serde_json::to_value(ExecuteCodeParams { code: code.into() })?;
        let result = self.call("execute", params, timeout).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Register a local tool the peer may call back into.
    ///
    /// The registry insert is local and synchronous; a duplicate name or a
    /// bad schema fails here with no wire I/O. On a live session the tool is
    /// then announced to the peer immediately; before `connect`, it is
    /// announced during the connect sequence. A failed live announcement
    /// rolls the insert back, so the name is free for a retry.
    pub async fn register_tool(&self, descriptor: ToolDescriptor) -> Result<(), SessionError> {
        let spec = descriptor.spec();
        let params = serde_json::to_value(&spec)?;
        self.registry().register(descriptor)?;

        if self.is_connected().await {
            let announced: Result<RegisterOutcome, SessionError> =
                self.typed_call("register_tool", params).await;
            match announced {
                Ok(outcome) => debug!(
                    tool = %spec.qualified_name(),
                    success = outcome.success,
                    "tool announced"
                ),
                Err(e) => {
                    self.registry().remove(&spec.namespace, &spec.name);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Ask the peer to attach an external MCP tool source.
    ///
    /// The URL is checked locally before anything is sent; registering the
    /// same source name twice is a peer-side error surfaced as
    /// [`SessionError::Remote`].
    pub async fn register_mcp(
        &self,
        server: McpServerSpec,
    ) -> Result<RegisterOutcome, SessionError> {
        Url::parse(&server.url).map_err(|e| SessionError::InvalidUrl {
            url: server.url.clone(),
            reason: e.to_string(),
        })?;
        self.typed_call("register_mcp", serde_json::to_value(&server)?)
            .await
    }

    async fn typed_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, SessionError> {
        let result = self
            .call(method, params, self.config().call_timeout)
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    #[tokio::test]
    async fn test_register_mcp_rejects_bad_url_locally() {
        let session = Session::new(SessionConfig::default());
        let err = session
            .register_mcp(McpServerSpec {
                name: "broken".to_string(),
                url: "not a url".to_string(),
                auth: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_register_tool_before_connect_is_local() {
        let session = Session::new(SessionConfig::default());
        session
            .register_tool(switchboard_tools::add_tool())
            .await
            .unwrap();
        assert_eq!(session.registry().len(), 1);

        // Wire never touched: a duplicate fails synchronously too.
        let err = session
            .register_tool(switchboard_tools::add_tool())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Registry(_)));
    }
}
