use crate::configuration::TargetSettings;
use crate::contract;
use crate::errors::ProbeError;
use reqwest::{Client, Method, Response};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

/// The identities the application under test distinguishes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Technician,
    Attendant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Technician => "technician",
            Role::Attendant => "attendant",
        }
    }
}

/// Authenticated HTTP client for the application under test.
///
/// Requests carry HTTP Basic auth with the fixture credentials until `login`
/// has produced a bearer token; from then on the token takes over, which is
/// what the role-gated routes look at. (Both write the same Authorization
/// header, so they cannot be combined.)
#[derive(Debug)]
pub struct TargetClient {
    base_url: String,
    username: String,
    password: Secret<String>,
    token: Option<Secret<String>>,
    role: Option<Role>,
    http_client: Client,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl TargetClient {
    pub fn build(settings: &TargetSettings) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            token: None,
            role: None,
            http_client,
            poll_interval: settings.poll_interval(),
            poll_timeout: settings.poll_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// The role reported by the last successful `login`.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Authenticate against the target and remember the issued bearer token.
    #[tracing::instrument(name = "Logging into target", skip(self))]
    pub async fn login(&mut self) -> Result<Role, ProbeError> {
        let endpoint = "/api/auth/login";
        let response = self.send(Method::POST, endpoint, None).await?;
        let response = contract::expect_status(response, &[200], endpoint)?;
        let body = contract::read_json(response, endpoint).await?;

        let token = body["token"]
            .as_str()
            .ok_or_else(|| ProbeError::contract(endpoint, "missing `token` field"))?;
        let role = match body["role"].as_str() {
            Some("admin") => Role::Admin,
            Some("technician") => Role::Technician,
            Some("attendant") => Role::Attendant,
            Some(other) => {
                return Err(ProbeError::contract(
                    endpoint,
                    format!("unexpected role `{}`", other),
                ));
            }
            None => return Err(ProbeError::contract(endpoint, "missing `role` field")),
        };

        self.token = Some(Secret::new(token.to_string()));
        self.role = Some(role);
        Ok(role)
    }

    pub async fn get(&self, path: &str) -> Result<Response, ProbeError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, ProbeError> {
        let builder = self
            .authenticated(Method::GET, path)
            .query(query)
            .header("Accept", "application/json");
        builder
            .send()
            .await
            .map_err(|e| ProbeError::transport(path, e))
    }

    pub async fn post_json<Body>(&self, path: &str, body: &Body) -> Result<Response, ProbeError>
    where
        Body: serde::Serialize,
    {
        self.send(Method::POST, path, Some(serde_json::to_value(body).map_err(
            |e| ProbeError::contract(path, format!("failed to serialize request body: {}", e)),
        )?))
        .await
    }

    pub async fn put_json<Body>(&self, path: &str, body: &Body) -> Result<Response, ProbeError>
    where
        Body: serde::Serialize,
    {
        self.send(Method::PUT, path, Some(serde_json::to_value(body).map_err(
            |e| ProbeError::contract(path, format!("failed to serialize request body: {}", e)),
        )?))
        .await
    }

    pub async fn patch_json<Body>(&self, path: &str, body: &Body) -> Result<Response, ProbeError>
    where
        Body: serde::Serialize,
    {
        self.send(Method::PATCH, path, Some(serde_json::to_value(body).map_err(
            |e| ProbeError::contract(path, format!("failed to serialize request body: {}", e)),
        )?))
        .await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, ProbeError> {
        self.send(Method::DELETE, path, None).await
    }

    /// Request without any credentials at all, for negative access checks.
    pub async fn get_unauthenticated(&self, path: &str) -> Result<Response, ProbeError> {
        self.http_client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| ProbeError::transport(path, e))
    }

    /// Request with a caller-supplied bearer token instead of the real one.
    pub async fn get_with_bearer(
        &self,
        path: &str,
        token: &str,
    ) -> Result<Response, ProbeError> {
        self.http_client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProbeError::transport(path, e))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, ProbeError> {
        let mut builder = self.authenticated(method, path);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        builder
            .send()
            .await
            .map_err(|e| ProbeError::transport(path, e))
    }

    fn authenticated(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http_client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder.basic_auth(&self.username, Some(self.password.expose_secret())),
        }
    }
}
