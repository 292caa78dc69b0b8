//! Admin SaaS probe: company and subscription management plus the metrics
//! snapshot. Subscription creation tolerates 404 since the endpoint is not
//! present on all deployments.

use crate::contract::{ResourceId, assert_listed, expect_status, extract_id, read_json};
use crate::errors::ProbeError;
use crate::lifecycle::Cleanup;
use crate::target_client::TargetClient;
use chrono::{Days, Utc};
use serde_json::json;

#[tracing::instrument(name = "Probing admin SaaS management", skip_all)]
pub async fn probe(client: &TargetClient) -> Result<(), ProbeError> {
    let companies_endpoint = "/api/admin-saas/empresas";
    let company_payload = json!({
        "name": "Test Company",
        "address": "123 Test St",
        "email": "testcompany@example.com",
        "phone": "1234567890"
    });
    let response = client.post_json(companies_endpoint, &company_payload).await?;
    let response = expect_status(response, &[201], companies_endpoint)?;
    let body = read_json(response, companies_endpoint).await?;
    let company_id = extract_id(&body, companies_endpoint)?;

    let mut cleanup = Cleanup::new();
    cleanup.register(format!(
        "{}/{}",
        companies_endpoint,
        company_id.as_path_segment()
    ));

    let outcome = exercise(client, &company_id, &mut cleanup).await;
    cleanup.run(client).await;
    outcome
}

async fn exercise(
    client: &TargetClient,
    company_id: &ResourceId,
    cleanup: &mut Cleanup,
) -> Result<(), ProbeError> {
    let subscription_id = create_subscription(client, company_id, cleanup).await?;

    let companies_endpoint = "/api/admin-saas/empresas";
    let response = client.get(companies_endpoint).await?;
    let response = expect_status(response, &[200], companies_endpoint)?;
    let body = read_json(response, companies_endpoint).await?;
    assert_listed(&body, company_id, companies_endpoint)?;

    if let Some(subscription_id) = &subscription_id {
        let subscriptions_endpoint = "/api/admin-saas/assinaturas";
        let response = client.get(subscriptions_endpoint).await?;
        let response = expect_status(response, &[200], subscriptions_endpoint)?;
        let body = read_json(response, subscriptions_endpoint).await?;
        assert_listed(&body, subscription_id, subscriptions_endpoint)?;
    }

    let metrics_endpoint = "/api/admin-saas/metrics";
    let response = client.get(metrics_endpoint).await?;
    let response = expect_status(response, &[200], metrics_endpoint)?;
    let body = read_json(response, metrics_endpoint).await?;
    if !body.is_object() {
        return Err(ProbeError::contract(
            metrics_endpoint,
            "metrics response is not a JSON object",
        ));
    }
    Ok(())
}

/// Returns `None` when the deployment has no subscription endpoint.
async fn create_subscription(
    client: &TargetClient,
    company_id: &ResourceId,
    cleanup: &mut Cleanup,
) -> Result<Option<ResourceId>, ProbeError> {
    let endpoint = "/api/admin-saas/assinaturas";
    let today = Utc::now();
    let payload = json!({
        "companyId": company_id.raw,
        "plan": "basic",
        "status": "active",
        "startDate": today.format("%Y-%m-%d").to_string(),
        "endDate": (today + Days::new(365)).format("%Y-%m-%d").to_string()
    });
    let response = client.post_json(endpoint, &payload).await?;
    if response.status().as_u16() == 404 {
        tracing::info!("Subscription endpoint not present on this deployment; skipping");
        return Ok(None);
    }
    let response = expect_status(response, &[201], endpoint)?;
    let body = read_json(response, endpoint).await?;
    let subscription_id = extract_id(&body, endpoint)?;
    cleanup.register(format!("{}/{}", endpoint, subscription_id.as_path_segment()));
    Ok(Some(subscription_id))
}
