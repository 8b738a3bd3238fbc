use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::Backend;
use crate::api::models::{ConversationPatch, ConversationSummary, Meeting, Message, ProjectSummary, SharedDocument, UserSummary};
use crate::error::{Error, Result};

pub struct ApiClient {
    pub http: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.to_string(),
            token,
        }
    }

    fn base_api(base_url: &str) -> String {
        let trimmed = base_url.trim_end_matches('/');
        if trimmed.ends_with("/api") { trimmed.to_string() } else { format!("{}/api", trimmed) }
    }

    /// Build `<base>/api/<segments...>`, percent-encoding each segment.
    fn endpoint<I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = Url::parse(&Self::base_api(&self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn with_auth(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(t) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", t));
        }
        req
    }

    fn check(endpoint: &Url, resp: Response) -> Result<Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(Error::Http { status: resp.status().as_u16(), endpoint: endpoint.to_string() })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Url) -> Result<T> {
        debug!("GET {}", endpoint);
        let resp = self.with_auth(self.http.get(endpoint.as_str())).send().await?;
        let resp = Self::check(&endpoint, resp)?;
        let json: Value = resp.json().await?;
        Ok(serde_json::from_value(unwrap_data(json))?)
    }

    async fn post_json(&self, endpoint: Url, body: &impl serde::Serialize) -> Result<Option<Value>> {
        debug!("POST {}", endpoint);
        let resp = self.with_auth(self.http.post(endpoint.as_str())).json(body).send().await?;
        let resp = Self::check(&endpoint, resp)?;
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(unwrap_data(serde_json::from_slice(&bytes)?)))
    }

    /// Check the server is reachable. Returns the HTTP status code of the health endpoint.
    pub async fn ping(&self) -> Result<u16> {
        let endpoint = self.endpoint(["ping"])?;
        let resp = self.with_auth(self.http.get(endpoint.as_str())).send().await?;
        Ok(resp.status().as_u16())
    }
}

/// Accept both bare payloads and `{ "data": ... }` envelopes.
fn unwrap_data(json: Value) -> Value {
    match json {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        let mut endpoint = self.endpoint(["conversations"])?;
        endpoint.query_pairs_mut().append_pair("userId", user_id);
        let json: Value = self.get_json(endpoint).await?;
        let items = match json {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("conversations") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(serde_json::from_value(item)?);
        }
        Ok(out)
    }

    async fn user(&self, user_id: &str) -> Result<UserSummary> {
        self.get_json(self.endpoint(["users", user_id])?).await
    }

    async fn project(&self, project_id: &str) -> Result<ProjectSummary> {
        self.get_json(self.endpoint(["projects", project_id])?).await
    }

    async fn post_message(&self, conversation_id: &str, message: &Message) -> Result<Message> {
        let confirmed = self.post_json(self.endpoint(["conversations", conversation_id, "messages"])?, message).await?;
        match confirmed {
            Some(json) => Ok(serde_json::from_value(json)?),
            None => Ok(message.clone()),
        }
    }

    async fn mark_read(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        let body = serde_json::json!({ "userId": user_id });
        self.post_json(self.endpoint(["conversations", conversation_id, "read"])?, &body).await?;
        Ok(())
    }

    async fn patch_conversation(&self, conversation_id: &str, patch: &ConversationPatch) -> Result<()> {
        let endpoint = self.endpoint(["conversations", conversation_id])?;
        debug!("PATCH {}", endpoint);
        let resp = self.with_auth(self.http.patch(endpoint.as_str())).json(patch).send().await?;
        Self::check(&endpoint, resp)?;
        Ok(())
    }

    async fn post_meeting(&self, conversation_id: &str, meeting: &Meeting) -> Result<()> {
        self.post_json(self.endpoint(["conversations", conversation_id, "meetings"])?, meeting).await?;
        Ok(())
    }

    async fn post_document(&self, conversation_id: &str, document: &SharedDocument) -> Result<()> {
        self.post_json(self.endpoint(["conversations", conversation_id, "documents"])?, document).await?;
        Ok(())
    }
}
