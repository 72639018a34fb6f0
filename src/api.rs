// Cloudflare API client: a small blocking HTTP client for the Workers KV
// endpoints. `CloudflareClient` covers account-level calls (namespaces),
// `KvNamespace` is the same client scoped to one namespace.

use anyhow::{bail, Context, Result};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

/// Default Cloudflare API v4 base URL.
pub const DEFAULT_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Environment variable overriding [`DEFAULT_API_URL`].
pub const API_URL_ENV: &str = "CLOUDFLARE_API_URL";

const KEYS_PAGE_LIMIT: u32 = 1000;
const NAMESPACES_PER_PAGE: u32 = 100;

/// One key returned by a key listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KvKey {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A KV namespace as reported by the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: String,
    pub title: String,
}

/// Key-value operations scoped to one namespace.
pub trait KvStore {
    /// All keys starting with `prefix`, across every page.
    fn list_keys(&self, prefix: &str) -> Result<Vec<KvKey>>;
    fn get(&self, key: &str) -> Result<String>;
    fn put(&self, key: &str, value: &str, metadata: &serde_json::Value) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Account-level namespace lookup and creation.
pub trait NamespaceDirectory {
    fn list_namespaces(&self) -> Result<Vec<Namespace>>;
    fn create_namespace(&self, title: &str) -> Result<Namespace>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Serialize)]
struct CreateNamespace<'a> {
    title: &'a str,
}

/// Blocking client bound to one account and API token.
#[derive(Clone)]
pub struct CloudflareClient {
    client: Client,
    base_url: String,
    token: String,
    account_id: String,
}

impl CloudflareClient {
    /// Create a client using `CLOUDFLARE_API_URL` or the public API endpoint.
    pub fn new(account_id: &str, token: &str) -> Result<Self> {
        let base_url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.into());
        Self::with_base_url(&base_url, account_id, token)
    }

    pub fn with_base_url(base_url: &str, account_id: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CloudflareClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            account_id: account_id.to_string(),
        })
    }

    /// Scope this client to a namespace.
    pub fn namespace(&self, namespace_id: &str) -> KvNamespace {
        KvNamespace {
            api: self.clone(),
            namespace_id: namespace_id.to_string(),
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let val = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .context("API token contains characters not allowed in a header")?;
        headers.insert(AUTHORIZATION, val);
        Ok(headers)
    }

    fn account_url(&self, path: &str) -> String {
        format!("{}/accounts/{}/{}", self.base_url, self.account_id, path)
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let res = req
            .headers(self.auth_headers()?)
            .send()
            .with_context(|| format!("Failed to send {what} request"))?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("{what} failed: {status} - {txt}");
        }
        Ok(res)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<(T, Option<ResultInfo>)> {
        let res = self.send(req, what)?;
        let envelope: Envelope<T> = res
            .json()
            .with_context(|| format!("Parsing {what} response json"))?;
        unwrap_envelope(envelope, what)
    }

    /// For calls whose `result` carries nothing useful: only `success` is checked.
    fn send_ack(&self, req: RequestBuilder, what: &str) -> Result<()> {
        let res = self.send(req, what)?;
        let envelope: Envelope<serde_json::Value> = res
            .json()
            .with_context(|| format!("Parsing {what} response json"))?;
        check_success(&envelope, what)
    }
}

fn check_success<T>(envelope: &Envelope<T>, what: &str) -> Result<()> {
    if envelope.success {
        return Ok(());
    }
    let detail = envelope
        .errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    bail!("{what} failed: {detail}")
}

fn unwrap_envelope<T>(envelope: Envelope<T>, what: &str) -> Result<(T, Option<ResultInfo>)> {
    check_success(&envelope, what)?;
    let result = envelope
        .result
        .with_context(|| format!("{what} response has no result"))?;
    Ok((result, envelope.result_info))
}

impl NamespaceDirectory for CloudflareClient {
    fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let url = self.account_url("storage/kv/namespaces");
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            debug!(page, "list KV namespaces");
            let req = self.client.get(&url).query(&[
                ("page", page.to_string()),
                ("per_page", NAMESPACES_PER_PAGE.to_string()),
            ]);
            let (batch, info): (Vec<Namespace>, _) = self.send_json(req, "List namespaces")?;
            let fetched = batch.len();
            all.extend(batch);
            let total_pages = info.and_then(|i| i.total_pages).unwrap_or(page);
            if fetched == 0 || page >= total_pages {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    fn create_namespace(&self, title: &str) -> Result<Namespace> {
        debug!(title, "create KV namespace");
        let req = self
            .client
            .post(self.account_url("storage/kv/namespaces"))
            .json(&CreateNamespace { title });
        let (ns, _) = self.send_json(req, "Create namespace")?;
        Ok(ns)
    }
}

/// A [`CloudflareClient`] scoped to one KV namespace.
#[derive(Clone)]
pub struct KvNamespace {
    api: CloudflareClient,
    namespace_id: String,
}

impl KvNamespace {
    pub fn from_config(config: &Config) -> Result<Self> {
        let cf = &config.cloudflare;
        Ok(CloudflareClient::new(&cf.account_id, &cf.api_token)?.namespace(&cf.kv_namespace_id))
    }

    fn url(&self, path: &str) -> String {
        self.api
            .account_url(&format!("storage/kv/namespaces/{}/{}", self.namespace_id, path))
    }

    fn value_url(&self, key: &str) -> String {
        self.url(&format!("values/{}", encode_key(key)))
    }
}

fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, NON_ALPHANUMERIC).to_string()
}

impl KvStore for KvNamespace {
    fn list_keys(&self, prefix: &str) -> Result<Vec<KvKey>> {
        let url = self.url("keys");
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            debug!(prefix, cursor = cursor.as_deref().unwrap_or(""), "list KV keys");
            let mut query = vec![
                ("prefix", prefix.to_string()),
                ("limit", KEYS_PAGE_LIMIT.to_string()),
            ];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }
            let req = self.api.client.get(&url).query(&query);
            let (batch, info): (Vec<KvKey>, _) = self.api.send_json(req, "List keys")?;
            keys.extend(batch);
            cursor = info.and_then(|i| i.cursor).filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
        }
        Ok(keys)
    }

    fn get(&self, key: &str) -> Result<String> {
        debug!(key, "get KV value");
        let req = self.api.client.get(self.value_url(key));
        let res = self.api.send(req, "Get value")?;
        res.text()
            .with_context(|| format!("Reading value of {key}"))
    }

    fn put(&self, key: &str, value: &str, metadata: &serde_json::Value) -> Result<()> {
        debug!(key, bytes = value.len(), "put KV value");
        let form = multipart::Form::new()
            .text("value", value.to_string())
            .text("metadata", metadata.to_string());
        let req = self.api.client.put(self.value_url(key)).multipart(form);
        self.api.send_ack(req, "Put value")
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(key, "delete KV value");
        let req = self.api.client.delete(self.value_url(key));
        self.api.send_ack(req, "Delete value")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const NS_PATH: &str = "/accounts/acc/storage/kv/namespaces";
    const KEYS_PATH: &str = "/accounts/acc/storage/kv/namespaces/ns1/keys";

    fn kv(server: &Server) -> KvNamespace {
        CloudflareClient::with_base_url(&server.url(), "acc", "tok")
            .unwrap()
            .namespace("ns1")
    }

    #[test]
    fn keys_are_percent_encoded() {
        assert_eq!(encode_key("file:2026-01-01/a b.txt"), "file%3A2026%2D01%2D01%2Fa%20b%2Etxt");
    }

    #[test]
    fn urls_are_scoped_to_account_and_namespace() {
        let api = CloudflareClient::with_base_url("https://api.example/v4/", "acc", "tok").unwrap();
        let ns = api.namespace("ns1");
        assert_eq!(
            ns.value_url("file:x"),
            "https://api.example/v4/accounts/acc/storage/kv/namespaces/ns1/values/file%3Ax"
        );
        assert_eq!(
            api.account_url("storage/kv/namespaces"),
            "https://api.example/v4/accounts/acc/storage/kv/namespaces"
        );
    }

    #[test]
    fn envelope_errors_are_surfaced() {
        let raw = r#"{"success":false,"errors":[{"code":10000,"message":"Authentication error"}],"result":null}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(raw).unwrap();
        let err = unwrap_envelope(envelope, "List keys").unwrap_err();
        assert_eq!(err.to_string(), "List keys failed: [10000] Authentication error");
    }

    #[test]
    fn key_listing_page_parses_cursor_and_metadata() {
        let raw = r#"{"success":true,"errors":[],"messages":[],
            "result":[{"name":"file:2026-01-01/a.txt","metadata":{"name":"a.txt","size":3}}],
            "result_info":{"count":1,"cursor":"abc"}}"#;
        let envelope: Envelope<Vec<KvKey>> = serde_json::from_str(raw).unwrap();
        let (keys, info) = unwrap_envelope(envelope, "List keys").unwrap();
        assert_eq!(keys[0].name, "file:2026-01-01/a.txt");
        assert_eq!(keys[0].metadata.as_ref().unwrap()["size"], 3);
        assert_eq!(info.unwrap().cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn list_keys_follows_cursor_across_pages() {
        let mut server = Server::new();
        let first = server
            .mock("GET", KEYS_PATH)
            .match_query(Matcher::Regex("^prefix=file%3A&limit=1000$".into()))
            .match_header("authorization", "Bearer tok")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"errors":[],"result":[{"name":"file:a"}],
                "result_info":{"count":1,"cursor":"c1"}}"#,
            )
            .create();
        let second = server
            .mock("GET", KEYS_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("prefix".into(), "file:".into()),
                Matcher::UrlEncoded("cursor".into(), "c1".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"errors":[],"result":[{"name":"file:b"}],
                "result_info":{"count":1,"cursor":""}}"#,
            )
            .create();

        let keys = kv(&server).list_keys("file:").unwrap();

        let names: Vec<_> = keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["file:a", "file:b"]);
        first.assert();
        second.assert();
    }

    #[test]
    fn list_namespaces_walks_all_pages() {
        let mut server = Server::new();
        let page1 = server
            .mock("GET", NS_PATH)
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"errors":[],"result":[{"id":"n1","title":"other"}],
                "result_info":{"page":1,"per_page":100,"count":1,"total_pages":2}}"#,
            )
            .create();
        let page2 = server
            .mock("GET", NS_PATH)
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"errors":[],"result":[{"id":"n2","title":"share"}],
                "result_info":{"page":2,"per_page":100,"count":1,"total_pages":2}}"#,
            )
            .create();

        let api = CloudflareClient::with_base_url(&server.url(), "acc", "tok").unwrap();
        let namespaces = api.list_namespaces().unwrap();

        assert_eq!(
            namespaces,
            vec![
                Namespace { id: "n1".into(), title: "other".into() },
                Namespace { id: "n2".into(), title: "share".into() },
            ]
        );
        page1.assert();
        page2.assert();
    }

    #[test]
    fn create_namespace_posts_title() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", NS_PATH)
            .match_body(Matcher::Json(serde_json::json!({"title": "share"})))
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"errors":[],"result":{"id":"n9","title":"share"}}"#)
            .create();

        let api = CloudflareClient::with_base_url(&server.url(), "acc", "tok").unwrap();
        let ns = api.create_namespace("share").unwrap();

        assert_eq!(ns.id, "n9");
        mock.assert();
    }

    #[test]
    fn get_returns_raw_body() {
        let mut server = Server::new();
        server
            .mock("GET", "/accounts/acc/storage/kv/namespaces/ns1/values/file%3Aa")
            .with_body(r#"{"name":"a"}"#)
            .create();

        assert_eq!(kv(&server).get("file:a").unwrap(), r#"{"name":"a"}"#);
    }

    #[test]
    fn put_sends_value_and_metadata_parts() {
        let mut server = Server::new();
        let mock = server
            .mock("PUT", "/accounts/acc/storage/kv/namespaces/ns1/values/file%3Aa")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="value""#.into()),
                Matcher::Regex(r#"\{"record":1\}"#.into()),
                Matcher::Regex(r#"name="metadata""#.into()),
                Matcher::Regex(r#"\{"name":"a\.txt","size":3\}"#.into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"errors":[],"messages":[],"result":null}"#)
            .create();

        kv(&server)
            .put(
                "file:a",
                r#"{"record":1}"#,
                &serde_json::json!({"name": "a.txt", "size": 3}),
            )
            .unwrap();
        mock.assert();
    }

    #[test]
    fn non_success_status_carries_status_and_body() {
        let mut server = Server::new();
        server
            .mock("DELETE", "/accounts/acc/storage/kv/namespaces/ns1/values/file%3Aa")
            .with_status(403)
            .with_body("denied")
            .create();

        let err = kv(&server).delete("file:a").unwrap_err();
        assert_eq!(err.to_string(), "Delete value failed: 403 Forbidden - denied");
    }
}
