//! Payment probe: creation, bounded status polling against the asynchronous
//! gateway integration, reconciliation and the gateway-shaped webhook.

use crate::contract::{ResourceId, expect_status, extract_id, read_json};
use crate::errors::ProbeError;
use crate::lifecycle::Cleanup;
use crate::target_client::TargetClient;
use serde_json::json;
use tokio::time::Instant;
use uuid::Uuid;

/// Statuses the gateway integration may legitimately report. Anything else
/// is a contract violation; `pending` at timeout is not a failure.
const KNOWN_STATUSES: [&str; 4] = ["approved", "rejected", "cancelled", "pending"];

#[tracing::instrument(name = "Probing payments", skip_all)]
pub async fn probe(client: &TargetClient) -> Result<(), ProbeError> {
    let create_endpoint = "/api/pagamentos/criar";
    // Unique reference so concurrent runs against the same instance do not
    // trip over each other's payments.
    let payload = json!({
        "amount": 15000,
        "currency_id": "ARS",
        "description": "Test payment via gateway",
        "payment_method_id": "mercadopago",
        "external_reference": format!("smokeprobe-{}", Uuid::new_v4())
    });

    let response = client.post_json(create_endpoint, &payload).await?;
    let response = expect_status(response, &[201], create_endpoint)?;
    let body = read_json(response, create_endpoint).await?;
    let payment_id = extract_id(&body, create_endpoint)?;

    let mut cleanup = Cleanup::new();
    cleanup.register(format!("/api/pagamentos/{}", payment_id.as_path_segment()));

    let outcome = exercise(client, &payment_id).await;
    cleanup.run(client).await;
    outcome
}

async fn exercise(client: &TargetClient, payment_id: &ResourceId) -> Result<(), ProbeError> {
    let terminal = poll_status(client, payment_id).await?;
    tracing::info!(payment = %payment_id, status = %terminal, "Payment status poll finished");

    let reconcile_endpoint = "/api/pagamentos/reconciliar";
    let response = client.post_json(reconcile_endpoint, &json!({})).await?;
    let response = expect_status(response, &[200], reconcile_endpoint)?;
    let body = read_json(response, reconcile_endpoint).await?;
    if !body.is_object() {
        return Err(ProbeError::contract(
            reconcile_endpoint,
            "reconciliation response is not a JSON object",
        ));
    }

    let webhook_endpoint = "/api/pagamentos/webhook";
    let webhook_payload = json!({
        "id": payment_id.raw,
        "type": "payment",
        "data": { "id": payment_id.raw, "status": terminal }
    });
    let response = client.post_json(webhook_endpoint, &webhook_payload).await?;
    expect_status(response, &[200, 204], webhook_endpoint)?;
    Ok(())
}

/// Poll the status endpoint at the configured interval until the payment
/// leaves `pending` or the poll timeout elapses. Returns the last observed
/// status; only an unknown or missing status fails the probe.
async fn poll_status(client: &TargetClient, payment_id: &ResourceId) -> Result<String, ProbeError> {
    let endpoint = "/api/pagamentos/status";
    let deadline = Instant::now() + client.poll_timeout();
    loop {
        let response = client
            .get_with_query(endpoint, &[("paymentId", payment_id.as_path_segment())])
            .await?;
        let response = expect_status(response, &[200], endpoint)?;
        let body = read_json(response, endpoint).await?;
        let status = body["status"]
            .as_str()
            .ok_or_else(|| ProbeError::contract(endpoint, "missing `status` field"))?
            .to_lowercase();

        if !KNOWN_STATUSES.contains(&status.as_str()) {
            return Err(ProbeError::contract(
                endpoint,
                format!("unexpected payment status `{}`", status),
            ));
        }
        if status != "pending" || Instant::now() >= deadline {
            return Ok(status);
        }
        tokio::time::sleep(client.poll_interval()).await;
    }
}
