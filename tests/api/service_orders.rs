use crate::helpers::spawn_target;
use claims::{assert_err, assert_ok};
use serde_json::json;
use smokeprobe::probes::service_orders;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_creation_and_edit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/ordens/criar"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "os-1",
            "status": "pending",
            "description": "Initial creation of service order for testing"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/ordens/os-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "os-1",
            "description": "Updated description after review",
            "equipment": "Laptop Model XYZ - updated specs"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_status_transition(server: &MockServer, status: &str) {
    Mock::given(method("PATCH"))
        .and(path("/api/ordens/os-1/status"))
        .and(body_partial_json(json!({"status": status})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "os-1", "status": status})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn status_sequence_with_visible_notifications_passes() {
    let target = spawn_target().await;
    mount_creation_and_edit(&target.server).await;
    mount_status_transition(&target.server, "in progress").await;
    mount_status_transition(&target.server, "completed").await;

    // One notification per transition; the first poll sees the first status,
    // later polls the full feed.
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .and(query_param("orderId", "os-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"orderId": "os-1", "status": "in progress", "recipientType": "client"}
        ])))
        .up_to_n_times(1)
        .mount(&target.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .and(query_param("orderId", "os-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"orderId": "os-1", "status": "in progress", "recipientType": "client"},
            {"orderId": "os-1", "status": "completed", "recipientType": "technician"}
        ])))
        .mount(&target.server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/ordens/os-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&target.server)
        .await;

    assert_ok!(service_orders::probe(&target.client()).await);
}

#[tokio::test]
async fn notification_polling_retries_until_the_record_appears() {
    let target = spawn_target().await;
    mount_creation_and_edit(&target.server).await;
    mount_status_transition(&target.server, "in progress").await;
    mount_status_transition(&target.server, "completed").await;

    // The feed is empty for the first two polls, then fills in.
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(2)
        .mount(&target.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"orderId": "os-1", "status": "in progress"},
            {"orderId": "os-1", "status": "completed"}
        ])))
        .mount(&target.server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/ordens/os-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&target.server)
        .await;

    assert_ok!(service_orders::probe(&target.client()).await);
}

#[tokio::test]
async fn a_missing_notification_fails_after_the_poll_timeout() {
    let target = spawn_target().await;
    mount_creation_and_edit(&target.server).await;
    mount_status_transition(&target.server, "in progress").await;

    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&target.server)
        .await;
    // Cleanup still deletes the order.
    Mock::given(method("DELETE"))
        .and(path("/api/ordens/os-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&target.server)
        .await;

    let error = assert_err!(service_orders::probe(&target.client()).await);
    assert!(error.to_string().contains("notification"));
}

#[tokio::test]
async fn a_transition_that_reports_the_wrong_status_fails_fast() {
    let target = spawn_target().await;
    mount_creation_and_edit(&target.server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/ordens/os-1/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "os-1", "status": "pending"})),
        )
        .mount(&target.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/ordens/os-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&target.server)
        .await;

    let error = assert_err!(service_orders::probe(&target.client()).await);
    assert!(error.to_string().contains("pending"));
}

#[tokio::test]
async fn a_creation_that_does_not_echo_pending_fails() {
    let target = spawn_target().await;
    Mock::given(method("POST"))
        .and(path("/api/ordens/criar"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "os-1",
            "status": "draft",
            "description": "Initial creation of service order for testing"
        })))
        .mount(&target.server)
        .await;
    // Even the immediate contract failure must not leak the created order.
    Mock::given(method("DELETE"))
        .and(path("/api/ordens/os-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&target.server)
        .await;

    assert_err!(service_orders::probe(&target.client()).await);
}
