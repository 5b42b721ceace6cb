//! Inbound call router: answers the peer's `execute_tool` requests.
//!
//! Spawned once per inbound call by the event loop. Every failure mode maps
//! to a coded error reply on the same envelope id; nothing here raises
//! locally or touches the pending-call table. Concurrent inbound calls run
//! their callbacks concurrently — serializing shared state is the callback
//! author's business.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use switchboard_protocol::{error_codes, ErrorResponse, ExecuteToolParams, Request, Response};
use switchboard_tools::ToolRegistry;

use crate::session::WriteCommand;

/// Resolve, validate, invoke, reply.
pub(crate) async fn handle_inbound_call(
    req: Request,
    registry: Arc<ToolRegistry>,
    write_tx: mpsc::Sender<WriteCommand>,
) {
    let id = req.id.clone();
    let encoded = match dispatch(req, &registry).await {
        Ok(result) => serde_json::to_string(&Response::ok(id, result)),
        Err((code, message)) => {
            warn!(code, message = %message, "inbound call failed");
            serde_json::to_string(&ErrorResponse::new(id, code, message))
        }
    };

    let text = match encoded {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "failed to encode inbound call reply");
            return;
        }
    };

    if write_tx.send(WriteCommand { text }).await.is_err() {
        warn!("session closed before inbound call reply could be written");
    }
}

async fn dispatch(req: Request, registry: &ToolRegistry) -> Result<Value, (i64, String)> {
    if req.method != "execute_tool" {
        return Err((
            error_codes::METHOD_NOT_FOUND,
            format!("unknown method '{}'", req.method),
        ));
    }

    let params = req
        .params
        .ok_or_else(|| (error_codes::INVALID_PARAMS, "missing params".to_string()))?;
    let params: ExecuteToolParams = serde_json::from_value(params).map_err(|e| {
        (
            error_codes::INVALID_PARAMS,
            format!("invalid execute_tool params: {}", e),
        )
    })?;

    let tool = registry
        .lookup(&params.namespace, &params.name)
        .ok_or_else(|| {
            (
                error_codes::METHOD_NOT_FOUND,
                format!(
                    "No tool `{}` exists in namespace `{}`",
                    params.name, params.namespace
                ),
            )
        })?;

    // A call without args is a call with empty args.
    let args = params.args.unwrap_or_else(|| Value::Object(Default::default()));
    tool.validate_input(&args).map_err(|reason| {
        (
            error_codes::INVALID_PARAMS,
            format!("Failed validating tool params: {}", reason),
        )
    })?;

    debug!(tool = %tool.qualified_name(), "invoking tool");
    let result = tool.invoke(args).await.map_err(|e| {
        (
            error_codes::INTERNAL_ERROR,
            format!("Failed executing tool: {}", e),
        )
    })?;

    tool.validate_output(&result).map_err(|reason| {
        (
            error_codes::INVALID_PARAMS,
            format!("Failed validating tool result: {}", reason),
        )
    })?;

    Ok(result)
}
