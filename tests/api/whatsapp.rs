use crate::helpers::spawn_target;
use claims::{assert_err, assert_ok};
use serde_json::json;
use smokeprobe::errors::ProbeError;
use smokeprobe::probes::whatsapp;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_connect(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/whatsapp/connect"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"connectionId": "conn-1"})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn connect_send_disconnect_passes() {
    let target = spawn_target().await;
    mount_connect(&target.server).await;
    Mock::given(method("POST"))
        .and(path("/api/whatsapp/enviar"))
        .and(body_partial_json(json!({"connectionId": "conn-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&target.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/whatsapp/disconnect"))
        .and(body_partial_json(json!({"connectionId": "conn-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"disconnected": true})))
        .expect(1)
        .mount(&target.server)
        .await;

    assert_ok!(whatsapp::probe(&target.client()).await);
}

#[tokio::test]
async fn a_send_reporting_only_a_message_id_is_accepted() {
    let target = spawn_target().await;
    mount_connect(&target.server).await;
    Mock::given(method("POST"))
        .and(path("/api/whatsapp/enviar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messageId": "msg-9"})))
        .mount(&target.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/whatsapp/disconnect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&target.server)
        .await;

    assert_ok!(whatsapp::probe(&target.client()).await);
}

#[tokio::test]
async fn a_failed_send_still_disconnects_the_connection() {
    let target = spawn_target().await;
    mount_connect(&target.server).await;
    Mock::given(method("POST"))
        .and(path("/api/whatsapp/enviar"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&target.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/whatsapp/disconnect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"disconnected": true})))
        .expect(1)
        .mount(&target.server)
        .await;

    let error = assert_err!(whatsapp::probe(&target.client()).await);
    assert!(matches!(
        error,
        ProbeError::UnexpectedStatus { actual: 500, .. }
    ));
}

#[tokio::test]
async fn a_connect_without_a_connection_id_fails() {
    let target = spawn_target().await;
    Mock::given(method("POST"))
        .and(path("/api/whatsapp/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "connected"})))
        .mount(&target.server)
        .await;

    let error = assert_err!(whatsapp::probe(&target.client()).await);
    assert!(error.to_string().contains("connectionId"));
}
