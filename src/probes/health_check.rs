use crate::contract::{expect_status, read_json};
use crate::errors::ProbeError;
use crate::target_client::TargetClient;

const HEALTHY_STATUSES: [&str; 3] = ["healthy", "ok", "up"];

/// The health endpoint must answer 200 with either a healthy `status` string
/// or a non-negative numeric `uptime`.
#[tracing::instrument(name = "Probing health check", skip_all)]
pub async fn probe(client: &TargetClient) -> Result<(), ProbeError> {
    let endpoint = "/api/health-check";
    let response = client.get(endpoint).await?;
    let response = expect_status(response, &[200], endpoint)?;
    let body = read_json(response, endpoint).await?;

    let has_status = body.get("status").is_some();
    let has_uptime = body.get("uptime").is_some();
    if !has_status && !has_uptime {
        return Err(ProbeError::contract(
            endpoint,
            "response carries neither `status` nor `uptime`",
        ));
    }

    if has_status {
        let status = body["status"]
            .as_str()
            .ok_or_else(|| ProbeError::contract(endpoint, "`status` is not a string"))?;
        if !HEALTHY_STATUSES.contains(&status.to_lowercase().as_str()) {
            return Err(ProbeError::contract(
                endpoint,
                format!("`status` is `{}`, which does not indicate health", status),
            ));
        }
    }

    if has_uptime {
        let uptime = body["uptime"]
            .as_f64()
            .ok_or_else(|| ProbeError::contract(endpoint, "`uptime` is not a number"))?;
        if uptime < 0.0 {
            return Err(ProbeError::contract(
                endpoint,
                format!("`uptime` is negative ({})", uptime),
            ));
        }
    }

    Ok(())
}
