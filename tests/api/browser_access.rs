use crate::helpers::{TestTarget, spawn_target};
use claims::{assert_err, assert_ok};
use serde_json::json;
use smokeprobe::errors::ProbeError;
use smokeprobe::probes::browser_access;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Mount the WebDriver conversation up to and including the login form
/// submission: session creation, navigation, element lookups, keystrokes,
/// click, and session teardown.
async fn mount_webdriver_login(target: &TestTarget) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"value": {"sessionId": "sess-1"}})),
        )
        .expect(1)
        .mount(&target.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/sess-1/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
        .expect(2)
        .mount(&target.server)
        .await;

    for (selector, element_id) in [
        ("input[name='username']", "el-user"),
        ("input[name='password']", "el-pass"),
        ("button[type='submit']", "el-submit"),
    ] {
        Mock::given(method("POST"))
            .and(path("/session/sess-1/element"))
            .and(body_partial_json(json!({"value": selector})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": {(ELEMENT_KEY): element_id}})),
            )
            .expect(1)
            .mount(&target.server)
            .await;
    }
    for element_path in [
        "/session/sess-1/element/el-user/value",
        "/session/sess-1/element/el-pass/value",
        "/session/sess-1/element/el-submit/click",
    ] {
        Mock::given(method("POST"))
            .and(path(element_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&target.server)
            .await;
    }

    // The remote session must die on every exit path.
    Mock::given(method("DELETE"))
        .and(path("/session/sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
        .expect(1)
        .mount(&target.server)
        .await;
}

async fn mount_current_url_sequence(target: &TestTarget, after_login: &str, final_url: &str) {
    Mock::given(method("GET"))
        .and(path("/session/sess-1/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": after_login})))
        .up_to_n_times(1)
        .mount(&target.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/sess-1/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": final_url})))
        .mount(&target.server)
        .await;
}

async fn mount_page_source(target: &TestTarget, html: &str) {
    Mock::given(method("GET"))
        .and(path("/session/sess-1/source"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": html})))
        .mount(&target.server)
        .await;
}

#[tokio::test]
async fn a_redirect_back_to_login_counts_as_denial() {
    let target = spawn_target().await;
    let base = target.server.uri();
    mount_webdriver_login(&target).await;
    mount_current_url_sequence(
        &target,
        &format!("{}/dashboard", base),
        &format!("{}/login?next=admin-saas", base),
    )
    .await;
    mount_page_source(&target, "<html><body>Entrar</body></html>").await;

    let outcome =
        browser_access::probe(&target.target_settings(), &target.browser_settings()).await;
    assert_ok!(outcome);
}

#[tokio::test]
async fn a_denial_message_on_the_privileged_page_counts_as_denial() {
    let target = spawn_target().await;
    let base = target.server.uri();
    mount_webdriver_login(&target).await;
    mount_current_url_sequence(
        &target,
        &format!("{}/dashboard", base),
        &format!("{}/admin-saas", base),
    )
    .await;
    mount_page_source(&target, "<html><body>Acesso negado</body></html>").await;

    let outcome =
        browser_access::probe(&target.target_settings(), &target.browser_settings()).await;
    assert_ok!(outcome);
}

#[tokio::test]
async fn an_accessible_privileged_page_fails_the_probe() {
    let target = spawn_target().await;
    let base = target.server.uri();
    mount_webdriver_login(&target).await;
    mount_current_url_sequence(
        &target,
        &format!("{}/dashboard", base),
        &format!("{}/admin-saas", base),
    )
    .await;
    mount_page_source(&target, "<html><body>Companies overview</body></html>").await;

    let error = assert_err!(
        browser_access::probe(&target.target_settings(), &target.browser_settings()).await
    );
    assert!(matches!(error, ProbeError::Contract { .. }));
}

#[tokio::test]
async fn a_missing_login_form_fails_the_probe_and_closes_the_session() {
    let target = spawn_target().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"value": {"sessionId": "sess-1"}})),
        )
        .mount(&target.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/sess-1/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
        .mount(&target.server)
        .await;
    // No element mock: the lookup gets the remote end's 404, i.e. not found.
    Mock::given(method("DELETE"))
        .and(path("/session/sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
        .expect(1)
        .mount(&target.server)
        .await;

    let error = assert_err!(
        browser_access::probe(&target.target_settings(), &target.browser_settings()).await
    );
    assert!(error.to_string().contains("input[name='username']"));
}
