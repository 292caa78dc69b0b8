//! Service order probe: creation, partial edit, then the status transition
//! sequence, each transition cross-checked against the notifications feed.

use crate::contract::{ResourceId, expect_status, extract_id, fields_round_trip, read_json};
use crate::errors::ProbeError;
use crate::lifecycle::Cleanup;
use crate::target_client::TargetClient;
use chrono::{Days, Utc};
use serde_json::json;
use tokio::time::Instant;

const STATUS_SEQUENCE: [&str; 2] = ["in progress", "completed"];

#[tracing::instrument(name = "Probing service orders", skip_all)]
pub async fn probe(client: &TargetClient) -> Result<(), ProbeError> {
    let create_endpoint = "/api/ordens/criar";
    let due_date = (Utc::now() + Days::new(30)).format("%Y-%m-%d").to_string();
    let payload = json!({
        "empresa_id": "test-empresa-789",
        "cliente_id": "test-client-123",
        "tecnico_id": "test-tech-456",
        "description": "Initial creation of service order for testing",
        "equipment": "Laptop Model XYZ",
        "status": "pending",
        "dataPrevistaConclusao": due_date
    });

    let response = client.post_json(create_endpoint, &payload).await?;
    let response = expect_status(response, &[201], create_endpoint)?;
    let body = read_json(response, create_endpoint).await?;
    let order_id = extract_id(&body, create_endpoint)?;

    let order_path = format!("/api/ordens/{}", order_id.as_path_segment());
    let mut cleanup = Cleanup::new();
    cleanup.register(&order_path);

    // The creation response must already reflect the initial state.
    let creation_echo = fields_round_trip(
        &json!({"status": "pending", "description": payload["description"]}),
        &body,
        &[],
        create_endpoint,
    );
    let outcome = match creation_echo {
        Ok(()) => exercise(client, &order_id, &order_path).await,
        Err(e) => Err(e),
    };
    cleanup.run(client).await;
    outcome
}

async fn exercise(
    client: &TargetClient,
    order_id: &ResourceId,
    order_path: &str,
) -> Result<(), ProbeError> {
    let edit = json!({
        "description": "Updated description after review",
        "equipment": "Laptop Model XYZ - updated specs"
    });
    let response = client.put_json(order_path, &edit).await?;
    let response = expect_status(response, &[200], order_path)?;
    let body = read_json(response, order_path).await?;
    fields_round_trip(&edit, &body, &[], order_path)?;

    for status in STATUS_SEQUENCE {
        transition_status(client, order_id, order_path, status).await?;
        await_notification(client, order_id, status).await?;
    }
    Ok(())
}

async fn transition_status(
    client: &TargetClient,
    order_id: &ResourceId,
    order_path: &str,
    status: &str,
) -> Result<(), ProbeError> {
    let endpoint = format!("{}/status", order_path);
    tracing::info!(order = %order_id, status, "Transitioning service order status");
    let response = client.patch_json(&endpoint, &json!({ "status": status })).await?;
    let response = expect_status(response, &[200], &endpoint)?;
    let body = read_json(response, &endpoint).await?;
    match body["status"].as_str() {
        Some(actual) if actual == status => Ok(()),
        Some(actual) => Err(ProbeError::contract(
            &endpoint,
            format!("status is `{}` after transition to `{}`", actual, status),
        )),
        None => Err(ProbeError::contract(&endpoint, "missing `status` field")),
    }
}

/// Poll the notifications feed until a record referencing this order and
/// status shows up, bounded by the configured poll timeout.
async fn await_notification(
    client: &TargetClient,
    order_id: &ResourceId,
    status: &str,
) -> Result<(), ProbeError> {
    let endpoint = "/api/notifications";
    let deadline = Instant::now() + client.poll_timeout();
    loop {
        let response = client
            .get_with_query(endpoint, &[("orderId", order_id.as_path_segment())])
            .await?;
        let response = expect_status(response, &[200], endpoint)?;
        let body = read_json(response, endpoint).await?;
        let notifications = body
            .as_array()
            .ok_or_else(|| ProbeError::contract(endpoint, "notifications response is not a list"))?;

        let visible = notifications
            .iter()
            .any(|n| n["orderId"] == order_id.raw && n["status"] == status);
        if visible {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ProbeError::contract(
                endpoint,
                format!(
                    "no notification for order {} with status `{}` within the poll timeout",
                    order_id, status
                ),
            ));
        }
        tokio::time::sleep(client.poll_interval()).await;
    }
}
