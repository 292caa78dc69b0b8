//! Client management probe: full CRUD + search lifecycle on `/api/clientes`,
//! interleaved with an equipment lifecycle nested under the created client.

use crate::errors::ProbeError;
use crate::lifecycle::{
    Cleanup, ResourceDescriptor, apply_update, create_resource, delete_resource, read_back,
    search_for, verify_gone,
};
use crate::target_client::TargetClient;
use serde_json::json;

fn client_descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "/api/clientes",
        json!({
            "empresaId": 1,
            "nome": "Test Client",
            "email": "testclient@example.com",
            "phone": "1234567890",
            "address": "123 Test Street"
        }),
        json!({
            "nome": "Updated Test Client",
            "email": "updatedclient@example.com",
            "phone": "0987654321",
            "address": "321 Updated Ave"
        }),
    )
    .with_search_term("Updated")
    // The target does not echo the tenant id back on reads.
    .ignoring_fields(&["empresaId"])
}

fn equipment_descriptor(client_path: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(
        format!("{}/equipamentos", client_path),
        json!({
            "type": "Laptop",
            "brand": "TestBrand",
            "model": "TestModel X1",
            "serial_number": "SN123456789"
        }),
        json!({
            "type": "Smartphone",
            "brand": "UpdatedBrand",
            "model": "UpdatedModel S9",
            "serial_number": "SN987654321"
        }),
    )
    .with_search_term("UpdatedBrand")
}

#[tracing::instrument(name = "Probing client management", skip_all)]
pub async fn probe(client: &TargetClient) -> Result<(), ProbeError> {
    let clients = client_descriptor();
    let client_id = create_resource(client, &clients).await?;
    let client_path = format!("{}/{}", clients.family, client_id.as_path_segment());

    let mut cleanup = Cleanup::new();
    cleanup.register(&client_path);

    let outcome = exercise(client, &clients, &client_id, &client_path, &mut cleanup).await;
    match outcome {
        Ok(()) => {
            cleanup.discharge(&client_path);
            delete_resource(client, &clients, &client_id).await?;
            verify_gone(client, &clients, &client_id).await
        }
        Err(e) => {
            cleanup.run(client).await;
            Err(e)
        }
    }
}

async fn exercise(
    client: &TargetClient,
    clients: &ResourceDescriptor,
    client_id: &crate::contract::ResourceId,
    client_path: &str,
    cleanup: &mut Cleanup,
) -> Result<(), ProbeError> {
    let equipment = equipment_descriptor(client_path);
    let equipment_id = create_resource(client, &equipment).await?;
    let equipment_path = format!("{}/{}", equipment.family, equipment_id.as_path_segment());
    cleanup.register(&equipment_path);

    read_back(client, clients, client_id, &clients.payload).await?;
    read_back(client, &equipment, &equipment_id, &equipment.payload).await?;

    apply_update(client, clients, client_id).await?;
    apply_update(client, &equipment, &equipment_id).await?;

    search_for(client, clients, client_id).await?;
    search_for(client, &equipment, &equipment_id).await?;

    delete_resource(client, &equipment, &equipment_id).await?;
    verify_gone(client, &equipment, &equipment_id).await?;
    cleanup.discharge(&equipment_path);

    Ok(())
}
