//! Status-code and field-level assertions shared by every probe.

use crate::errors::ProbeError;
use reqwest::Response;
use serde_json::Value;

/// A server-assigned resource identifier, as it appeared in the response.
///
/// The target issues both string and integer ids depending on the resource
/// family, so we keep the raw JSON value for equality checks against listing
/// responses and a rendered form for building paths.
#[derive(Debug, Clone)]
pub struct ResourceId {
    pub raw: Value,
    rendered: String,
}

impl ResourceId {
    pub fn as_path_segment(&self) -> &str {
        &self.rendered
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Fail unless the response status is one of `accepted`.
pub fn expect_status(
    response: Response,
    accepted: &[u16],
    endpoint: &str,
) -> Result<Response, ProbeError> {
    let actual = response.status().as_u16();
    if accepted.contains(&actual) {
        Ok(response)
    } else {
        Err(ProbeError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            expected: accepted
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" or "),
            actual,
        })
    }
}

/// Decode the response body as JSON; a body that is not JSON is a contract
/// violation, not a transport fault.
pub async fn read_json(response: Response, endpoint: &str) -> Result<Value, ProbeError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| ProbeError::contract(endpoint, format!("response body is not JSON: {}", e)))
}

/// Pull the server-assigned `id` out of a creation response.
pub fn extract_id(body: &Value, endpoint: &str) -> Result<ResourceId, ProbeError> {
    let raw = body
        .get("id")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ProbeError::contract(endpoint, "missing `id` in creation response"))?;
    let rendered = match raw {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(ProbeError::contract(
                endpoint,
                format!("`id` has unusable value {}", raw),
            ));
        }
    };
    Ok(ResourceId {
        raw: raw.clone(),
        rendered,
    })
}

/// Every field we sent must come back unchanged. Fields in `ignored` are
/// known not to be echoed by the target and are skipped.
pub fn fields_round_trip(
    sent: &Value,
    fetched: &Value,
    ignored: &[String],
    endpoint: &str,
) -> Result<(), ProbeError> {
    let sent = sent.as_object().ok_or_else(|| {
        ProbeError::contract(endpoint, "expected payload is not a JSON object")
    })?;
    for (key, expected) in sent {
        if ignored.iter().any(|k| k == key) {
            continue;
        }
        match fetched.get(key) {
            Some(actual) if actual == expected => {}
            Some(actual) => {
                return Err(ProbeError::contract(
                    endpoint,
                    format!("field `{}` is {} but {} was sent", key, actual, expected),
                ));
            }
            None => {
                return Err(ProbeError::contract(
                    endpoint,
                    format!("field `{}` is missing from the response", key),
                ));
            }
        }
    }
    Ok(())
}

/// Shallow merge for partial-update expectations: submitted fields overwrite,
/// unsent fields retain their prior value.
pub fn merge_fields(base: &Value, update: &Value) -> Value {
    let mut merged = base.clone();
    if let (Some(merged), Some(update)) = (merged.as_object_mut(), update.as_object()) {
        for (key, value) in update {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// A listing response must be an array containing an entry with the given id.
pub fn assert_listed(
    body: &Value,
    id: &ResourceId,
    endpoint: &str,
) -> Result<(), ProbeError> {
    let items = body
        .as_array()
        .ok_or_else(|| ProbeError::contract(endpoint, "search response is not an array"))?;
    if items.iter().any(|item| item["id"] == id.raw) {
        Ok(())
    } else {
        Err(ProbeError::contract(
            endpoint,
            format!("resource {} not present in search results", id),
        ))
    }
}

/// At least one of the named fields must be present and truthy-ish.
pub fn require_any_field<'a>(
    body: &Value,
    keys: &[&'a str],
    endpoint: &str,
) -> Result<&'a str, ProbeError> {
    for key in keys.iter().copied() {
        if body.get(key).is_some_and(|v| !v.is_null()) {
            return Ok(key);
        }
    }
    Err(ProbeError::contract(
        endpoint,
        format!("none of the expected fields {:?} present", keys),
    ))
}
