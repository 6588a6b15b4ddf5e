//! # odata: transport shared by every Innovator entity API
//!
//! [`ODataClient`] owns the HTTP client and the authenticated [`Session`]; the
//! entity modules (`parts`, `documents`, `files`, `airworthiness`) only build
//! urls and payloads and hand them to it.
//!
//! Every non-2xx response becomes [`PlmError::Status`] carrying the body the
//! server sent, so callers see Innovator's own fault message.

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::error::{PlmError, ValidationError};
use crate::session::Session;

/// `{ "value": [...] }` wrapper returned for every collection query.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ODataCollection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A single Innovator item. Only `id` is guaranteed; everything else stays as
/// the JSON the server returned.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Item {
    pub id: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Item {
    /// String property lookup; numbers are rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A relationship row (`Part BOM`, `Part CAD`, ...) expanded with its related item.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Relationship {
    pub id: String,
    #[serde(default)]
    pub related_id: Option<Item>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// Quotes an OData string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn require_key(value: &str, what: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyKey { what })
    } else {
        Ok(())
    }
}

fn parse_url(raw: String) -> Result<Url, PlmError> {
    Url::parse(&raw).map_err(|e| PlmError::BaseUrl {
        url: raw,
        reason: e.to_string(),
    })
}

/// `{base}/server/odata/{entity_set}`
pub fn collection_url(base_url: &str, entity_set: &str) -> Result<Url, PlmError> {
    parse_url(format!("{base_url}/server/odata/{entity_set}"))
}

/// `{base}/server/odata/{entity_set}('{id}')`
pub fn item_url(base_url: &str, entity_set: &str, id: &str) -> Result<Url, PlmError> {
    parse_url(format!(
        "{base_url}/server/odata/{entity_set}({})",
        quote_literal(id)
    ))
}

/// `{base}/server/odata/{entity_set}?$filter={field} eq '{value}'`
pub fn filter_url(
    base_url: &str,
    entity_set: &str,
    field: &str,
    value: &str,
) -> Result<Url, PlmError> {
    let mut url = collection_url(base_url, entity_set)?;
    url.query_pairs_mut()
        .append_pair("$filter", &format!("{field} eq {}", quote_literal(value)));
    Ok(url)
}

/// `{base}/server/odata/{entity_set}('{id}')/{relationship}?$expand=related_id`
pub fn relationship_url(
    base_url: &str,
    entity_set: &str,
    id: &str,
    relationship: &str,
) -> Result<Url, PlmError> {
    let mut url = parse_url(format!(
        "{base_url}/server/odata/{entity_set}({})/{relationship}",
        quote_literal(id)
    ))?;
    url.query_pairs_mut().append_pair("$expand", "related_id");
    Ok(url)
}

/// `{base}/vault/odata/{action}`
pub fn vault_url(base_url: &str, action: &str) -> Result<Url, PlmError> {
    parse_url(format!("{base_url}/vault/odata/{action}"))
}

/// Authenticated OData transport.
#[derive(Debug, Clone)]
pub struct ODataClient {
    http: reqwest::Client,
    session: Session,
}

impl ODataClient {
    pub fn new(http: reqwest::Client, session: Session) -> Self {
        Self { http, session }
    }

    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }

    /// Request builder with the bearer header already applied.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, self.session.bearer())
    }

    /// Sends a request and returns the body text of a 2xx response.
    pub async fn send(
        &self,
        method: &'static str,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<String, PlmError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(method, url = %url, status = %status, "Innovator request failed");
            return Err(PlmError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        debug!(method, url = %url, status = %status, "Innovator request succeeded");
        Ok(body)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, PlmError> {
        info!(url = %url, "GET");
        let body = self
            .send("GET", &url, self.request(Method::GET, url.clone()))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn post<T: DeserializeOwned>(&self, url: Url, payload: &Value) -> Result<T, PlmError> {
        info!(url = %url, "POST");
        debug!(payload = %payload, "POST payload");
        let request = self.request(Method::POST, url.clone()).json(payload);
        let body = self.send("POST", &url, request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        url: Url,
        payload: &Value,
    ) -> Result<T, PlmError> {
        info!(url = %url, "PATCH");
        debug!(payload = %payload, "PATCH payload");
        let request = self.request(Method::PATCH, url.clone()).json(payload);
        let body = self.send("PATCH", &url, request).await?;
        // Innovator answers some PATCHes with 204 and no body.
        if body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn delete(&self, url: Url) -> Result<(), PlmError> {
        info!(url = %url, "DELETE");
        self.send("DELETE", &url, self.request(Method::DELETE, url.clone()))
            .await?;
        Ok(())
    }
}
