//! WhatsApp integration probe: connect, send one message through the
//! connection, disconnect. The connection is torn down on every exit path.

use crate::contract::{expect_status, read_json, require_any_field};
use crate::errors::ProbeError;
use crate::target_client::TargetClient;
use serde_json::json;

#[tracing::instrument(name = "Probing WhatsApp integration", skip_all)]
pub async fn probe(client: &TargetClient) -> Result<(), ProbeError> {
    let connect_endpoint = "/api/whatsapp/connect";
    let response = client.post_json(connect_endpoint, &json!({})).await?;
    let response = expect_status(response, &[200], connect_endpoint)?;
    let body = read_json(response, connect_endpoint).await?;
    let connection_id = body["connectionId"]
        .as_str()
        .ok_or_else(|| ProbeError::contract(connect_endpoint, "missing `connectionId`"))?
        .to_string();

    let outcome = exercise(client, &connection_id).await;
    match outcome {
        Ok(()) => disconnect(client, &connection_id).await,
        Err(e) => {
            // Best effort: never leave a dangling connection behind.
            if let Err(cleanup_error) = disconnect(client, &connection_id).await {
                tracing::warn!(error = %cleanup_error, "Failed to disconnect after probe failure");
            }
            Err(e)
        }
    }
}

async fn exercise(client: &TargetClient, connection_id: &str) -> Result<(), ProbeError> {
    let send_endpoint = "/api/whatsapp/enviar";
    let message = json!({
        "connectionId": connection_id,
        "to": "5511999999999@c.us",
        "message": "Smoke probe message"
    });
    let response = client.post_json(send_endpoint, &message).await?;
    let response = expect_status(response, &[200], send_endpoint)?;
    let body = read_json(response, send_endpoint).await?;
    if body["success"] == true || body.get("messageId").is_some_and(|v| !v.is_null()) {
        Ok(())
    } else {
        Err(ProbeError::contract(
            send_endpoint,
            "message send reported neither `success` nor a `messageId`",
        ))
    }
}

async fn disconnect(client: &TargetClient, connection_id: &str) -> Result<(), ProbeError> {
    let endpoint = "/api/whatsapp/disconnect";
    let response = client
        .post_json(endpoint, &json!({ "connectionId": connection_id }))
        .await?;
    let response = expect_status(response, &[200], endpoint)?;
    let body = read_json(response, endpoint).await?;
    require_any_field(&body, &["disconnected", "success"], endpoint)?;
    Ok(())
}
