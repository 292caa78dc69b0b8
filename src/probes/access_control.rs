//! Role-based access control probe over direct HTTP calls.
//!
//! One fixed identity logs in; the role reported by the login response
//! decides which entries of the route table the identity may reach. Every
//! other entry must be rejected with 401/403, as must missing and forged
//! bearer tokens on a protected route.

use crate::contract::expect_status;
use crate::errors::ProbeError;
use crate::target_client::{Role, TargetClient};

pub struct RouteRule {
    pub role: Role,
    pub endpoint: &'static str,
    pub allowed: bool,
}

/// Which role owns which endpoint, and whether that role may GET it.
pub fn route_rules() -> Vec<RouteRule> {
    vec![
        RouteRule {
            role: Role::Admin,
            endpoint: "/api/admin-saas/metrics",
            allowed: true,
        },
        RouteRule {
            role: Role::Technician,
            endpoint: "/api/ordens/criar",
            allowed: false,
        },
        RouteRule {
            role: Role::Attendant,
            endpoint: "/api/clientes",
            allowed: true,
        },
    ]
}

const PROTECTED_ROUTE: &str = "/api/admin-saas/metrics";

#[tracing::instrument(name = "Probing access control", skip_all)]
pub async fn probe(client: &mut TargetClient) -> Result<(), ProbeError> {
    let role = client.login().await?;
    tracing::info!(role = role.as_str(), "Authenticated against target");

    for rule in route_rules() {
        let expected_allowed = role == rule.role && rule.allowed;
        check_route(client, &rule, expected_allowed).await?;
    }

    // Protected routes must reject the unauthenticated and the forged alike.
    let response = client.get_unauthenticated(PROTECTED_ROUTE).await?;
    expect_status(response, &[401], PROTECTED_ROUTE)?;

    let response = client
        .get_with_bearer(PROTECTED_ROUTE, "invalid-token")
        .await?;
    expect_status(response, &[401], PROTECTED_ROUTE)?;

    Ok(())
}

async fn check_route(
    client: &TargetClient,
    rule: &RouteRule,
    expected_allowed: bool,
) -> Result<(), ProbeError> {
    let response = client.get(rule.endpoint).await?;
    let status = response.status();
    if expected_allowed {
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::UnexpectedStatus {
                endpoint: rule.endpoint.to_string(),
                expected: "2xx".to_string(),
                actual: status.as_u16(),
            })
        }
    } else {
        expect_status(response, &[401, 403], rule.endpoint)?;
        Ok(())
    }
}
