//! Browser-driven access probe: the same denial contract as the direct HTTP
//! access probe, exercised through a rendered login form via WebDriver.
//!
//! Flow: anonymous → submit credentials → authenticated → navigate to a
//! privileged route → denied or allowed, decided by URL and page content.
//! Waits for navigation are bounded and non-fatal; they only stabilize the
//! page before inspection.

use crate::configuration::{BrowserSettings, TargetSettings};
use crate::errors::ProbeError;
use crate::webdriver::{BrowserSession, WebDriverClient};
use secrecy::ExposeSecret;
use tokio::time::Instant;

const DENIAL_MARKERS: [&str; 4] = ["acesso negado", "access denied", "401", "403"];

#[tracing::instrument(name = "Probing access control via browser", skip_all)]
pub async fn probe(
    target: &TargetSettings,
    browser: &BrowserSettings,
) -> Result<(), ProbeError> {
    let driver = WebDriverClient::build(&browser.webdriver_url, target.timeout())
        .map_err(ProbeError::UnexpectedError)?;
    let session = driver.new_session(browser.headless).await?;

    let outcome = exercise(&session, target, browser).await;
    // The remote session dies on every exit path.
    session.close().await;
    outcome
}

async fn exercise(
    session: &BrowserSession,
    target: &TargetSettings,
    browser: &BrowserSettings,
) -> Result<(), ProbeError> {
    let base_url = target.base_url.trim_end_matches('/');
    let login_url = format!("{}{}", base_url, browser.login_path);
    session.goto(&login_url).await?;

    fill_login_form(session, target, browser).await?;

    // Wait for the form submission to navigate away from the login page.
    // Best-effort only: a timeout here is not a failure, the denial check
    // below is the actual assertion.
    if !wait_for_url_change(session, &login_url, browser).await? {
        tracing::info!("URL did not change after login submit; continuing anyway");
    }

    let privileged_url = format!("{}{}", base_url, browser.privileged_path);
    session.goto(&privileged_url).await?;
    let _ = wait_for_url_change(session, &privileged_url, browser).await?;

    let current_url = session.current_url().await?;
    let page = session.page_source().await?.to_lowercase();

    let redirected_away = !current_url.starts_with(&privileged_url);
    let denial_on_page = DENIAL_MARKERS.iter().any(|marker| page.contains(marker));
    if redirected_away || denial_on_page {
        tracing::info!(%current_url, "Privileged route denied as expected");
        Ok(())
    } else {
        Err(ProbeError::contract(
            browser.privileged_path.clone(),
            "privileged route neither redirected nor rendered a denial",
        ))
    }
}

async fn fill_login_form(
    session: &BrowserSession,
    target: &TargetSettings,
    browser: &BrowserSettings,
) -> Result<(), ProbeError> {
    let username_field = session
        .find_element(&browser.username_selector)
        .await?
        .ok_or_else(|| {
            ProbeError::contract(
                browser.login_path.clone(),
                format!("no element matches `{}`", browser.username_selector),
            )
        })?;
    session.send_keys(&username_field, &target.username).await?;

    let password_field = session
        .find_element(&browser.password_selector)
        .await?
        .ok_or_else(|| {
            ProbeError::contract(
                browser.login_path.clone(),
                format!("no element matches `{}`", browser.password_selector),
            )
        })?;
    session
        .send_keys(&password_field, target.password.expose_secret())
        .await?;

    let submit = session
        .find_element(&browser.submit_selector)
        .await?
        .ok_or_else(|| {
            ProbeError::contract(
                browser.login_path.clone(),
                format!("no element matches `{}`", browser.submit_selector),
            )
        })?;
    session.click(&submit).await
}

/// Poll the current URL until it differs from `from`, bounded by the wait
/// timeout. Returns whether a change was observed.
async fn wait_for_url_change(
    session: &BrowserSession,
    from: &str,
    browser: &BrowserSettings,
) -> Result<bool, ProbeError> {
    let deadline = Instant::now() + browser.wait_timeout();
    loop {
        let current = session.current_url().await?;
        if current.trim_end_matches('/') != from.trim_end_matches('/') {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
}
