//! Best-effort client for the Remnawave panel API.
//!
//! Upstream bodies are classified before anything is read from them: a body is either a
//! wrapped list, a bare list or degraded, and every list item either matches the known shape
//! of its resource or is degraded and dropped. Callers always get a value; failures surface
//! only through [`SystemInfo::status`] and the logs.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::RemnawaveConfig;
use crate::utils::format_traffic;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub version: String,
    pub status: String,
    pub total_users: u64,
    pub active_users: u64,
    pub online_users: u64,
}

impl SystemInfo {
    fn unavailable(status: &str) -> Self {
        Self {
            version: "-".to_string(),
            status: status.to_string(),
            total_users: 0,
            active_users: 0,
            online_users: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemnawaveUser {
    pub username: String,
    pub status: String,
    pub traffic: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemnawaveHost {
    pub id: String,
    pub address: String,
    pub port: u64,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemnawaveNode {
    pub id: String,
    pub name: String,
    pub address: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemnawaveInbound {
    pub tag: String,
    pub protocol: String,
    pub port: u64,
    pub enabled: bool,
}

// ============================================================================
// Response classification
// ============================================================================

/// Shape of a list endpoint's body.
#[derive(Debug, PartialEq)]
pub enum ListBody {
    /// `{"response": [...]}`, `{"response": {"<resource>": [...]}}` or `{"<resource>": [...]}`.
    Wrapped(Vec<Value>),
    Bare(Vec<Value>),
    Degraded,
}

impl ListBody {
    pub fn classify(body: Value, resource: &str) -> Self {
        match body {
            Value::Array(items) => ListBody::Bare(items),
            Value::Object(mut map) => {
                match map.remove("response") {
                    Some(Value::Array(items)) => return ListBody::Wrapped(items),
                    Some(Value::Object(mut inner)) => {
                        if let Some(Value::Array(items)) = inner.remove(resource) {
                            return ListBody::Wrapped(items);
                        }
                    }
                    _ => {}
                }
                match map.remove(resource) {
                    Some(Value::Array(items)) => ListBody::Wrapped(items),
                    _ => ListBody::Degraded,
                }
            }
            _ => ListBody::Degraded,
        }
    }

    pub fn into_items(self) -> Vec<Value> {
        match self {
            ListBody::Wrapped(items) | ListBody::Bare(items) => items,
            ListBody::Degraded => Vec::new(),
        }
    }
}

/// One list element after classification.
#[derive(Debug, PartialEq)]
pub enum Item<T> {
    Known(T),
    Degraded,
}

/// Known shapes of the four list resources.
pub trait Normalize: Sized {
    const RESOURCE: &'static str;
    const PATH: &'static str;

    fn normalize(item: &Map<String, Value>) -> Item<Self>;
}

fn text<'a>(item: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// Ids arrive as strings (`uuid`) or integers (`id`).
fn ident(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match item.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn number(item: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| match item.get(*k) {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn flag(item: &Map<String, Value>, key: &str) -> Option<bool> {
    item.get(key).and_then(Value::as_bool)
}

/// `expiryTime` (unix seconds) or `expireAt` (RFC 3339) as `YYYY-MM-DD`, `-` when neither parses.
fn expiry_date(item: &Map<String, Value>) -> String {
    let from_unix = number(item, &["expiryTime"])
        .filter(|secs| *secs > 0)
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
        .map(|dt| dt.date_naive());
    let from_iso = || {
        text(item, &["expireAt", "expiresAt"]).and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.date_naive())
                .ok()
                .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        })
    };

    from_unix
        .or_else(from_iso)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl Normalize for RemnawaveUser {
    const RESOURCE: &'static str = "users";
    const PATH: &'static str = "/api/users";

    fn normalize(item: &Map<String, Value>) -> Item<Self> {
        let Some(username) = text(item, &["username", "name"]) else {
            return Item::Degraded;
        };
        let status = match text(item, &["status"]) {
            Some(s) => s.to_string(),
            None if flag(item, "enable") == Some(true) => "active".to_string(),
            None => "disabled".to_string(),
        };
        let used = number(item, &["usedTraffic", "usedTrafficBytes"]).unwrap_or(0);

        Item::Known(RemnawaveUser {
            username: username.to_string(),
            status,
            traffic: format_traffic(used),
            expires_at: expiry_date(item),
        })
    }
}

impl Normalize for RemnawaveHost {
    const RESOURCE: &'static str = "hosts";
    const PATH: &'static str = "/api/hosts";

    fn normalize(item: &Map<String, Value>) -> Item<Self> {
        let Some(id) = ident(item, &["id", "uuid"]) else {
            return Item::Degraded;
        };
        Item::Known(RemnawaveHost {
            id,
            address: text(item, &["address", "host"]).unwrap_or_default().to_string(),
            port: number(item, &["port"]).unwrap_or(0),
            remark: text(item, &["remark", "name"]).unwrap_or_default().to_string(),
        })
    }
}

impl Normalize for RemnawaveNode {
    const RESOURCE: &'static str = "nodes";
    const PATH: &'static str = "/api/nodes";

    fn normalize(item: &Map<String, Value>) -> Item<Self> {
        let Some(id) = ident(item, &["id", "uuid"]) else {
            return Item::Degraded;
        };
        let status = match text(item, &["status"]) {
            Some(s) => s.to_string(),
            None if flag(item, "online") == Some(true) || flag(item, "isConnected") == Some(true) => {
                "online".to_string()
            }
            None => "offline".to_string(),
        };
        Item::Known(RemnawaveNode {
            id,
            name: text(item, &["name", "remark"]).unwrap_or_default().to_string(),
            address: text(item, &["address", "host"]).unwrap_or_default().to_string(),
            status,
        })
    }
}

impl Normalize for RemnawaveInbound {
    const RESOURCE: &'static str = "inbounds";
    const PATH: &'static str = "/api/inbounds";

    fn normalize(item: &Map<String, Value>) -> Item<Self> {
        let Some(tag) = text(item, &["tag", "remark"]) else {
            return Item::Degraded;
        };
        Item::Known(RemnawaveInbound {
            tag: tag.to_string(),
            protocol: text(item, &["protocol", "type"]).unwrap_or_default().to_string(),
            port: number(item, &["port"]).unwrap_or(0),
            enabled: flag(item, "enable") != Some(false),
        })
    }
}

/// Classifies a list body and keeps the items with a known shape.
pub fn normalize_list<T: Normalize>(body: Value) -> Vec<T> {
    let classified = ListBody::classify(body, T::RESOURCE);
    if classified == ListBody::Degraded {
        tracing::debug!("Remnawave {} response has an unknown shape", T::RESOURCE);
    }

    classified
        .into_items()
        .iter()
        .filter_map(|value| {
            let item = match value.as_object() {
                Some(map) => T::normalize(map),
                None => Item::Degraded,
            };
            match item {
                Item::Known(v) => Some(v),
                Item::Degraded => {
                    tracing::debug!("Dropping degraded Remnawave {} item: {}", T::RESOURCE, value);
                    None
                }
            }
        })
        .collect()
}

/// System stats answer either bare or under `response`. Anything else keeps zeroed counters.
pub fn normalize_system(body: Value) -> SystemInfo {
    let stats = match body {
        Value::Object(mut map) => match map.remove("response") {
            Some(Value::Object(inner)) => Some(inner),
            _ => Some(map),
        },
        _ => None,
    };

    let Some(stats) = stats else {
        tracing::debug!("Remnawave system stats have an unknown shape");
        return SystemInfo::unavailable("online");
    };

    let users = stats.get("users").and_then(Value::as_object);
    let nested = |key: &str| users.and_then(|u| number(u, &[key]));

    SystemInfo {
        version: text(&stats, &["version"]).unwrap_or("-").to_string(),
        status: "online".to_string(),
        total_users: number(&stats, &["totalUsers"]).or_else(|| nested("totalUsers")).unwrap_or(0),
        active_users: number(&stats, &["activeUsers"]).or_else(|| nested("activeUsers")).unwrap_or(0),
        online_users: number(&stats, &["onlineUsers"])
            .or_else(|| stats.get("onlineStats").and_then(Value::as_object).and_then(|o| number(o, &["onlineNow"])))
            .unwrap_or(0),
    }
}

/// `REMNAWAVE_HOST` as-is when it carries a scheme, otherwise `http://host:port`.
pub fn base_url(config: &RemnawaveConfig) -> Option<String> {
    let host = config.host.as_deref()?.trim().trim_end_matches('/');
    if host.is_empty() {
        return None;
    }
    if host.starts_with("http://") || host.starts_with("https://") {
        Some(host.to_string())
    } else {
        Some(format!("http://{}:{}", host, config.port))
    }
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug, Clone)]
struct Upstream {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone)]
pub struct RemnawaveService {
    upstream: Option<Upstream>,
}

fn default_headers(config: &RemnawaveConfig, token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).context("Invalid REMNAWAVE_TOKEN")?,
    );
    if let Some(caddy) = config.caddy_token.as_deref() {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(caddy).context("Invalid REMNAWAVE_CADDY_TOKEN")?,
        );
    }
    if let Some(cookie) = config.cookie.as_deref() {
        headers.insert(COOKIE, HeaderValue::from_str(cookie).context("Invalid REMNAWAVE_COOKIE")?);
    }
    Ok(headers)
}

impl RemnawaveService {
    pub fn new(config: &RemnawaveConfig) -> Self {
        let (Some(base_url), Some(token)) = (base_url(config), config.token.as_deref()) else {
            tracing::warn!(
                "Remnawave credentials not configured. Host: {}, Token: {}",
                config.host.as_deref().unwrap_or("not set"),
                if config.token.is_some() { "set" } else { "not set" }
            );
            return Self { upstream: None };
        };

        let http = default_headers(config, token).and_then(|headers| {
            reqwest::Client::builder()
                .default_headers(headers)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .context("Failed to build Remnawave HTTP client")
        });

        match http {
            Ok(http) => {
                tracing::info!("Remnawave client initialized: {}", base_url);
                Self { upstream: Some(Upstream { http, base_url }) }
            }
            Err(e) => {
                tracing::error!("Remnawave client disabled: {:#}", e);
                Self { upstream: None }
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.upstream.is_some()
    }

    async fn fetch(upstream: &Upstream, path: &str) -> Result<Value> {
        let url = format!("{}{}", upstream.base_url, path);
        let response = upstream
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?
            .error_for_status()
            .with_context(|| format!("Remnawave returned an error for {}", path))?;

        response.json::<Value>().await.context("Failed to parse Remnawave response")
    }

    pub async fn system_info(&self) -> SystemInfo {
        let Some(upstream) = &self.upstream else {
            return SystemInfo::unavailable("Not configured");
        };
        match Self::fetch(upstream, "/api/system/stats").await {
            Ok(body) => normalize_system(body),
            Err(e) => {
                tracing::error!("Failed to get Remnawave system info: {:#}", e);
                SystemInfo::unavailable("offline")
            }
        }
    }

    async fn list<T: Normalize>(&self) -> Vec<T> {
        let Some(upstream) = &self.upstream else {
            return Vec::new();
        };
        match Self::fetch(upstream, T::PATH).await {
            Ok(body) => normalize_list(body),
            Err(e) => {
                tracing::error!("Failed to get Remnawave {}: {:#}", T::RESOURCE, e);
                Vec::new()
            }
        }
    }

    pub async fn users(&self) -> Vec<RemnawaveUser> {
        self.list().await
    }

    pub async fn hosts(&self) -> Vec<RemnawaveHost> {
        self.list().await
    }

    pub async fn nodes(&self) -> Vec<RemnawaveNode> {
        self.list().await
    }

    pub async fn inbounds(&self) -> Vec<RemnawaveInbound> {
        self.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_bodies_are_classified() {
        assert_eq!(ListBody::classify(json!([1]), "users"), ListBody::Bare(vec![json!(1)]));
        assert_eq!(ListBody::classify(json!({"response": [2]}), "users"), ListBody::Wrapped(vec![json!(2)]));
        assert_eq!(
            ListBody::classify(json!({"response": {"users": [3], "total": 1}}), "users"),
            ListBody::Wrapped(vec![json!(3)])
        );
        assert_eq!(ListBody::classify(json!({"users": [4]}), "users"), ListBody::Wrapped(vec![json!(4)]));
        assert_eq!(ListBody::classify(json!({"message": "nope"}), "users"), ListBody::Degraded);
        assert_eq!(ListBody::classify(json!("html"), "users"), ListBody::Degraded);
    }

    #[test]
    fn users_normalize_field_variants() {
        let body = json!({"users": [
            {"username": "alice", "status": "ACTIVE", "usedTraffic": 1536, "expiryTime": 1_700_000_000},
            {"name": "bob", "enable": true},
            {"name": "carol", "enable": false, "expireAt": "2025-01-31T12:00:00.000Z"},
            {"status": "ACTIVE"},
            "garbage"
        ]});
        let users: Vec<RemnawaveUser> = normalize_list(body);

        assert_eq!(users.len(), 3);
        assert_eq!(users[0].traffic, "1.5 KB");
        assert_eq!(users[0].expires_at, "2023-11-14");
        assert_eq!(users[1].status, "active");
        assert_eq!(users[1].traffic, "0 B");
        assert_eq!(users[1].expires_at, "-");
        assert_eq!(users[2].status, "disabled");
        assert_eq!(users[2].expires_at, "2025-01-31");
    }

    #[test]
    fn hosts_nodes_and_inbounds_use_fallback_keys() {
        let hosts: Vec<RemnawaveHost> =
            normalize_list(json!([{"uuid": "h-1", "host": "1.1.1.1", "port": 443, "name": "edge"}]));
        assert_eq!(
            hosts,
            vec![RemnawaveHost { id: "h-1".into(), address: "1.1.1.1".into(), port: 443, remark: "edge".into() }]
        );

        let nodes: Vec<RemnawaveNode> =
            normalize_list(json!({"response": [{"id": 7, "remark": "de", "address": "x", "online": true}, {"name": "no-id"}]}));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "7");
        assert_eq!(nodes[0].name, "de");
        assert_eq!(nodes[0].status, "online");

        let inbounds: Vec<RemnawaveInbound> = normalize_list(json!([
            {"tag": "vless", "type": "vless", "port": "8443"},
            {"remark": "trojan", "protocol": "trojan", "enable": false}
        ]));
        assert!(inbounds[0].enabled);
        assert_eq!(inbounds[0].protocol, "vless");
        assert_eq!(inbounds[0].port, 8443);
        assert!(!inbounds[1].enabled);
    }

    #[test]
    fn system_stats_shapes() {
        let flat = normalize_system(json!({"version": "1.6", "totalUsers": 10, "activeUsers": 4, "onlineUsers": 2}));
        assert_eq!(flat.version, "1.6");
        assert_eq!(flat.total_users, 10);
        assert_eq!(flat.online_users, 2);

        let wrapped = normalize_system(json!({"response": {"users": {"totalUsers": 5}, "onlineStats": {"onlineNow": 1}}}));
        assert_eq!(wrapped.total_users, 5);
        assert_eq!(wrapped.online_users, 1);
        assert_eq!(wrapped.version, "-");

        let degraded = normalize_system(json!([1, 2]));
        assert_eq!(degraded.status, "online");
        assert_eq!(degraded.total_users, 0);
    }

    #[test]
    fn base_url_rules() {
        let mut config = RemnawaveConfig { port: 3000, ..Default::default() };
        assert_eq!(base_url(&config), None);

        config.host = Some("remnawave".into());
        assert_eq!(base_url(&config).as_deref(), Some("http://remnawave:3000"));

        config.host = Some("https://panel.example.com/".into());
        assert_eq!(base_url(&config).as_deref(), Some("https://panel.example.com"));
    }

    #[tokio::test]
    async fn unconfigured_client_returns_defaults() {
        let service = RemnawaveService::new(&RemnawaveConfig::default());
        assert!(!service.is_configured());
        assert_eq!(service.system_info().await.status, "Not configured");
        assert!(service.users().await.is_empty());
        assert!(service.inbounds().await.is_empty());
    }
}
