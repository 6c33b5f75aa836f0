use crate::models::Story;
use crate::storage;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SyncErrorKind {
    /// No relay configured; the journal is local-only.
    Disabled,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug)]
pub(crate) struct SyncError {
    pub kind: SyncErrorKind,
    pub message: String,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl SyncError {
    fn disabled() -> Self {
        Self {
            kind: SyncErrorKind::Disabled,
            message: "Sync is not configured".to_string(),
        }
    }

    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: SyncErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: SyncErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: SyncErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub(crate) type SyncResult<T> = Result<T, SyncError>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub relay_url: Option<String>,
}

impl EnvConfig {
    pub fn new() -> Self {
        // We support BOTH `window.ENV.RELAY_URL` (documented in README) and
        // `window.ENV.relay_url` (legacy/implementation detail) for compatibility.
        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    // 1) Prefer README style: RELAY_URL
                    if let Ok(relay_url) = js_sys::Reflect::get(&env, &"RELAY_URL".into()) {
                        if let Some(url_str) = relay_url.as_string() {
                            return Self {
                                relay_url: Some(url_str),
                            };
                        }
                    }

                    // 2) Fallback: relay_url
                    if let Ok(relay_url) = js_sys::Reflect::get(&env, &"relay_url".into()) {
                        if let Some(url_str) = relay_url.as_string() {
                            return Self {
                                relay_url: Some(url_str),
                            };
                        }
                    }
                }
            }
        }

        Self { relay_url: None }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn get_env_relay_url() -> Option<String> {
    EnvConfig::new().relay_url
}

/// Client for the server-side relay. The relay owns the notes-service
/// credential; nothing here attaches a token and no token ever reaches
/// the browser. With no base URL every call short-circuits to `Disabled`.
#[derive(Clone)]
pub(crate) struct SyncClient {
    base_url: Option<String>,
}

impl SyncClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        Self { base_url }
    }

    /// The localStorage override wins over `window.ENV`; with neither the
    /// client comes up disabled.
    pub fn load_from_storage() -> Self {
        Self::new(storage::load_relay_url_override().or_else(get_env_relay_url))
    }

    pub fn enabled(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    async fn request_json<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl serde::Serialize>,
    ) -> SyncResult<T> {
        let base = self.base_url.as_deref().ok_or_else(SyncError::disabled)?;
        let client = reqwest::Client::new();
        let mut req = client.request(method, format!("{base}{path}"));

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(SyncError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(SyncError::parse)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(SyncError::http(status, body, "Relay request failed"))
        }
    }

    /// Like `request_json` but only checks the status; update and archive
    /// responses carry no payload worth decoding.
    async fn request_status(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl serde::Serialize>,
    ) -> SyncResult<()> {
        let base = self.base_url.as_deref().ok_or_else(SyncError::disabled)?;
        let client = reqwest::Client::new();
        let mut req = client.request(method, format!("{base}{path}"));

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(SyncError::network)?;

        if res.status().is_success() {
            Ok(())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(SyncError::http(status, body, "Relay request failed"))
        }
    }

    pub async fn create(&self, story: &Story) -> SyncResult<String> {
        let data: serde_json::Value = self
            .request_json(reqwest::Method::POST, "/create", Some(story))
            .await?;

        match Self::parse_remote_ref(&data) {
            Some(remote_ref) => Ok(remote_ref),
            None => Err(SyncError::parse(format!(
                "Create succeeded but response is missing the story reference: {data}"
            ))),
        }
    }

    pub async fn update(&self, remote_ref: &str, story: &Story) -> SyncResult<()> {
        self.request_status(
            reqwest::Method::PATCH,
            &format!("/update/{remote_ref}"),
            Some(story),
        )
        .await
    }

    /// Archive on the remote side; the relay keeps the record, the journal
    /// forgets it.
    pub async fn archive(&self, remote_ref: &str) -> SyncResult<()> {
        self.request_status(
            reqwest::Method::PATCH,
            &format!("/delete/{remote_ref}"),
            Some(&serde_json::json!({})),
        )
        .await
    }

    pub async fn fetch_all(&self) -> SyncResult<Vec<Story>> {
        let data: serde_json::Value = self
            .request_json(
                reqwest::Method::POST,
                "/fetch",
                Some(&serde_json::json!({})),
            )
            .await?;
        Ok(Self::parse_fetch_response(data))
    }

    /// Relay create responses have been observed with different key
    /// spellings; accept the common forms.
    pub(crate) fn parse_remote_ref(data: &serde_json::Value) -> Option<String> {
        data.get("remoteRef")
            .or_else(|| data.get("remote_ref"))
            .or_else(|| data.get("id"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
    }

    pub(crate) fn parse_fetch_response(data: serde_json::Value) -> Vec<Story> {
        let list = match data {
            serde_json::Value::Array(items) => items,
            other => other
                .get("stories")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default(),
        };

        let mut out: Vec<Story> = Vec::with_capacity(list.len());
        for item in list {
            // Preferred: the record decodes on the canonical contract.
            if let Ok(mut story) = serde_json::from_value::<Story>(item.clone()) {
                if story.id.trim().is_empty() {
                    continue;
                }
                // A fetched record exists remotely by definition.
                if story.remote_ref.is_none() {
                    story.remote_ref = Some(story.id.clone());
                }
                out.push(story);
                continue;
            }

            let get_s = |k: &str| item.get(k).and_then(|v| v.as_str()).map(|s| s.to_string());

            let id = get_s("id").unwrap_or_default();
            if id.trim().is_empty() {
                continue;
            }

            let tags = item
                .get("tags")
                .and_then(|v| v.as_array())
                .map(|a| {
                    a.iter()
                        .filter_map(|t| t.as_str().map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default();

            let remote_ref = get_s("remoteRef")
                .or_else(|| get_s("remote_ref"))
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| id.clone());

            out.push(Story {
                id,
                title: get_s("title").unwrap_or_default(),
                content: get_s("content").unwrap_or_default(),
                tags,
                favorite: item.get("favorite").and_then(|v| v.as_bool()).unwrap_or(false),
                created_at: get_s("createdAt")
                    .or_else(|| get_s("created_at"))
                    .unwrap_or_default(),
                remote_ref: Some(remote_ref),
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_normalizes_the_base_url() {
        let client = SyncClient::new(Some("  https://relay.example/  ".to_string()));
        assert!(client.enabled());
        assert_eq!(client.base_url(), Some("https://relay.example"));

        assert!(!SyncClient::new(Some("   ".to_string())).enabled());
        assert!(!SyncClient::new(Some(String::new())).enabled());
        assert!(!SyncClient::new(None).enabled());
    }

    #[test]
    fn test_parse_remote_ref_accepts_known_spellings() {
        let parse = |v| SyncClient::parse_remote_ref(&v);
        assert_eq!(parse(json!({ "remoteRef": "r1" })), Some("r1".to_string()));
        assert_eq!(parse(json!({ "remote_ref": "r2" })), Some("r2".to_string()));
        assert_eq!(parse(json!({ "id": "r3" })), Some("r3".to_string()));
        assert_eq!(parse(json!({ "ok": true })), None);
        assert_eq!(parse(json!({ "remoteRef": "  " })), None);
    }

    #[test]
    fn test_parse_fetch_response_accepts_wrapped_and_bare_arrays() {
        let record = json!({
            "id": "s1",
            "title": "t",
            "content": "c",
            "createdAt": "2024-01-01T00:00:00.000Z"
        });

        let wrapped = SyncClient::parse_fetch_response(json!({ "stories": [record] }));
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].id, "s1");

        let bare = SyncClient::parse_fetch_response(json!([record]));
        assert_eq!(bare.len(), 1);

        assert!(SyncClient::parse_fetch_response(json!({ "ok": true })).is_empty());
    }

    #[test]
    fn test_parse_fetch_response_skips_records_without_an_id() {
        let out = SyncClient::parse_fetch_response(json!({
            "stories": [
                { "title": "no id", "content": "c", "createdAt": "2024-01-01T00:00:00.000Z" },
                { "id": "  ", "title": "blank id", "content": "c", "createdAt": "2024-01-01T00:00:00.000Z" },
                { "id": "keep", "title": "t", "content": "c", "createdAt": "2024-01-01T00:00:00.000Z" }
            ]
        }));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "keep");
    }

    #[test]
    fn test_parse_fetch_response_fills_defaults() {
        // Lenient record: no title/content/favorite, snake_case remote ref.
        let out = SyncClient::parse_fetch_response(json!({
            "stories": [
                { "id": "a", "remote_ref": "page-a" },
                { "id": "b", "title": "t", "content": "c", "createdAt": "2024-01-01T00:00:00.000Z" }
            ]
        }));

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].remote_ref, Some("page-a".to_string()));
        assert!(!out[0].favorite);
        assert!(out[0].tags.is_empty());

        // The record's own id stands in when no ref is given.
        assert_eq!(out[1].remote_ref, Some("b".to_string()));
    }
}
