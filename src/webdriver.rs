//! Minimal W3C WebDriver client, just enough to drive a login form and
//! navigate to a protected route. Talks plain JSON over HTTP to a local
//! chromedriver/geckodriver instance.

use crate::contract::{expect_status, read_json};
use crate::errors::ProbeError;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

/// W3C element identifier key used in element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Clone)]
pub struct WebDriverClient {
    server_url: String,
    http_client: Client,
}

/// A live browser session. Must be closed explicitly; `close` is called on
/// every exit path by the browser probe.
#[derive(Debug)]
pub struct BrowserSession {
    client: WebDriverClient,
    session_id: String,
}

#[derive(Debug, Clone)]
pub struct ElementRef(String);

impl WebDriverClient {
    pub fn build(server_url: &str, timeout: Duration) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Open a new browser session.
    #[tracing::instrument(name = "Opening browser session", skip(self))]
    pub async fn new_session(&self, headless: bool) -> Result<BrowserSession, ProbeError> {
        let mut args = vec![
            "--window-size=1280,720".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if headless {
            args.push("--headless=new".to_string());
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let body = self.execute("POST", "/session", Some(capabilities)).await?;
        let session_id = body["value"]["sessionId"]
            .as_str()
            .ok_or_else(|| ProbeError::contract("/session", "missing `sessionId`"))?
            .to_string();
        Ok(BrowserSession {
            client: self.clone(),
            session_id,
        })
    }

    async fn execute(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ProbeError> {
        let url = format!("{}{}", self.server_url, path);
        let builder = match method {
            "POST" => self.http_client.post(&url).json(&body.unwrap_or(json!({}))),
            "DELETE" => self.http_client.delete(&url),
            _ => self.http_client.get(&url),
        };
        let response = builder
            .send()
            .await
            .map_err(|e| ProbeError::transport(path, e))?;
        let response = expect_status(response, &[200], path)?;
        read_json(response, path).await
    }
}

impl BrowserSession {
    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.session_id, suffix)
    }

    pub async fn goto(&self, url: &str) -> Result<(), ProbeError> {
        let path = self.path("/url");
        self.client
            .execute("POST", &path, Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, ProbeError> {
        let path = self.path("/url");
        let body = self.client.execute("GET", &path, None).await?;
        body["value"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ProbeError::contract(&path, "missing current URL"))
    }

    /// Find a single element by CSS selector. A missing element is reported
    /// as `Ok(None)` because the remote end answers 404 for it.
    pub async fn find_element(&self, css: &str) -> Result<Option<ElementRef>, ProbeError> {
        let path = self.path("/element");
        let url = format!("{}{}", self.client.server_url, path);
        let response = self
            .client
            .http_client
            .post(&url)
            .json(&json!({ "using": "css selector", "value": css }))
            .send()
            .await
            .map_err(|e| ProbeError::transport(&path, e))?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let response = expect_status(response, &[200], &path)?;
        let body = read_json(response, &path).await?;
        let element_id = body["value"][ELEMENT_KEY]
            .as_str()
            .ok_or_else(|| ProbeError::contract(&path, "missing element reference"))?;
        Ok(Some(ElementRef(element_id.to_string())))
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), ProbeError> {
        let path = self.path(&format!("/element/{}/value", element.0));
        self.client
            .execute("POST", &path, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    pub async fn click(&self, element: &ElementRef) -> Result<(), ProbeError> {
        let path = self.path(&format!("/element/{}/click", element.0));
        self.client.execute("POST", &path, Some(json!({}))).await?;
        Ok(())
    }

    pub async fn page_source(&self) -> Result<String, ProbeError> {
        let path = self.path("/source");
        let body = self.client.execute("GET", &path, None).await?;
        body["value"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ProbeError::contract(&path, "missing page source"))
    }

    /// Tear down the remote session. Failures are swallowed; there is nothing
    /// useful to do with a session that refuses to die.
    pub async fn close(self) {
        let path = self.path("");
        if let Err(e) = self.client.execute("DELETE", &path, None).await {
            tracing::warn!(error = %e, "Failed to close browser session");
        }
    }
}
