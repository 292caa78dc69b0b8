//! The authenticated resource lifecycle: create, read, update, search,
//! delete, verify-gone, with best-effort cleanup on every exit path.

use crate::contract::{
    ResourceId, assert_listed, expect_status, extract_id, fields_round_trip, merge_fields,
    read_json,
};
use crate::errors::ProbeError;
use crate::target_client::TargetClient;
use serde_json::Value;

/// Describes one resource family and the payloads used to exercise it.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Collection path, e.g. `/api/clientes`. Item paths are `{family}/{id}`.
    pub family: String,
    /// Some families create through a dedicated path (`/api/ordens/criar`).
    pub create_path: Option<String>,
    pub payload: Value,
    pub update: Value,
    /// Substring expected to match the updated resource in a filtered listing.
    pub search_term: String,
    /// Fields the target is known not to echo back on reads.
    pub ignored_fields: Vec<String>,
}

impl ResourceDescriptor {
    pub fn new(family: impl Into<String>, payload: Value, update: Value) -> Self {
        Self {
            family: family.into(),
            create_path: None,
            payload,
            update,
            search_term: String::new(),
            ignored_fields: Vec::new(),
        }
    }

    pub fn with_create_path(mut self, path: impl Into<String>) -> Self {
        self.create_path = Some(path.into());
        self
    }

    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn ignoring_fields(mut self, fields: &[&str]) -> Self {
        self.ignored_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    fn create_endpoint(&self) -> &str {
        self.create_path.as_deref().unwrap_or(&self.family)
    }

    fn item_path(&self, id: &ResourceId) -> String {
        format!("{}/{}", self.family, id.as_path_segment())
    }
}

/// Tracks created resources so they can be deleted no matter how the probe
/// exits. Deletion failures are logged, never escalated.
#[derive(Debug, Default)]
pub struct Cleanup {
    pending: Vec<String>,
}

impl Cleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, item_path: impl Into<String>) {
        self.pending.push(item_path.into());
    }

    /// Drop an entry the probe has already deleted itself.
    pub fn discharge(&mut self, item_path: &str) {
        self.pending.retain(|p| p != item_path);
    }

    #[tracing::instrument(name = "Running best-effort cleanup", skip_all)]
    pub async fn run(self, client: &TargetClient) {
        // Delete in reverse creation order so nested resources go first.
        for item_path in self.pending.into_iter().rev() {
            match client.delete(&item_path).await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(resource = %item_path, "Cleaned up leftover resource");
                }
                Ok(response) => {
                    tracing::warn!(
                        resource = %item_path,
                        status = response.status().as_u16(),
                        "Cleanup delete was rejected"
                    );
                }
                Err(e) => {
                    tracing::warn!(resource = %item_path, error = %e, "Cleanup delete failed");
                }
            }
        }
    }
}

/// Create the resource and hand back the server-assigned id.
#[tracing::instrument(name = "Creating resource", skip(client, descriptor), fields(family = %descriptor.family))]
pub async fn create_resource(
    client: &TargetClient,
    descriptor: &ResourceDescriptor,
) -> Result<ResourceId, ProbeError> {
    let endpoint = descriptor.create_endpoint();
    let response = client.post_json(endpoint, &descriptor.payload).await?;
    let response = expect_status(response, &[201], endpoint)?;
    let body = read_json(response, endpoint).await?;
    extract_id(&body, endpoint)
}

/// Fetch by id and check that every created field round-trips unchanged.
pub async fn read_back(
    client: &TargetClient,
    descriptor: &ResourceDescriptor,
    id: &ResourceId,
    expected: &Value,
) -> Result<Value, ProbeError> {
    let endpoint = descriptor.item_path(id);
    let response = client.get(&endpoint).await?;
    let response = expect_status(response, &[200], &endpoint)?;
    let body = read_json(response, &endpoint).await?;
    fields_round_trip(expected, &body, &descriptor.ignored_fields, &endpoint)?;
    Ok(body)
}

/// Apply the partial update and verify merge semantics: submitted fields
/// change, unsent fields retain their prior value.
#[tracing::instrument(name = "Updating resource", skip(client, descriptor, id), fields(family = %descriptor.family))]
pub async fn apply_update(
    client: &TargetClient,
    descriptor: &ResourceDescriptor,
    id: &ResourceId,
) -> Result<Value, ProbeError> {
    let endpoint = descriptor.item_path(id);
    let response = client.put_json(&endpoint, &descriptor.update).await?;
    let response = expect_status(response, &[200], &endpoint)?;
    let body = read_json(response, &endpoint).await?;
    fields_round_trip(
        &descriptor.update,
        &body,
        &descriptor.ignored_fields,
        &endpoint,
    )?;

    let expected = merge_fields(&descriptor.payload, &descriptor.update);
    read_back(client, descriptor, id, &expected).await
}

/// A filtered listing must include the resource.
pub async fn search_for(
    client: &TargetClient,
    descriptor: &ResourceDescriptor,
    id: &ResourceId,
) -> Result<(), ProbeError> {
    let endpoint = &descriptor.family;
    let response = client
        .get_with_query(endpoint, &[("search", descriptor.search_term.as_str())])
        .await?;
    let response = expect_status(response, &[200], endpoint)?;
    let body = read_json(response, endpoint).await?;
    assert_listed(&body, id, endpoint)
}

pub async fn delete_resource(
    client: &TargetClient,
    descriptor: &ResourceDescriptor,
    id: &ResourceId,
) -> Result<(), ProbeError> {
    let endpoint = descriptor.item_path(id);
    let response = client.delete(&endpoint).await?;
    expect_status(response, &[200, 204], &endpoint)?;
    Ok(())
}

/// The core round-trip invariant: reading a deleted resource yields 404.
pub async fn verify_gone(
    client: &TargetClient,
    descriptor: &ResourceDescriptor,
    id: &ResourceId,
) -> Result<(), ProbeError> {
    let endpoint = descriptor.item_path(id);
    let response = client.get(&endpoint).await?;
    expect_status(response, &[404], &endpoint)?;
    Ok(())
}

/// Run the whole create → read → update → search → delete → verify-gone
/// sequence for one resource family, cleaning up on every exit path.
#[tracing::instrument(name = "Running resource lifecycle", skip_all, fields(family = %descriptor.family))]
pub async fn run_lifecycle(
    client: &TargetClient,
    descriptor: &ResourceDescriptor,
) -> Result<(), ProbeError> {
    let id = create_resource(client, descriptor).await?;
    let mut cleanup = Cleanup::new();
    let item_path = descriptor.item_path(&id);
    cleanup.register(&item_path);

    let outcome = exercise(client, descriptor, &id).await;
    match outcome {
        Ok(()) => {
            cleanup.discharge(&item_path);
            delete_resource(client, descriptor, &id).await?;
            verify_gone(client, descriptor, &id).await
        }
        Err(e) => {
            cleanup.run(client).await;
            Err(e)
        }
    }
}

async fn exercise(
    client: &TargetClient,
    descriptor: &ResourceDescriptor,
    id: &ResourceId,
) -> Result<(), ProbeError> {
    read_back(client, descriptor, id, &descriptor.payload).await?;
    apply_update(client, descriptor, id).await?;
    if !descriptor.search_term.is_empty() {
        search_for(client, descriptor, id).await?;
    }
    Ok(())
}
