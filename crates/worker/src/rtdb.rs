//! Access to one device's subtree of the realtime database.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::auth::TokenSource;

/// Read/write access to `/devices/{device_id}`. Paths are relative to that
/// node, e.g. `controls` or `ai/now`.
#[async_trait]
pub trait Store: Send + Sync {
    /// The value at `path`, or `Value::Null` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Value>;

    /// Replace the value at `path`.
    async fn set(&self, path: &str, value: &Value) -> Result<()>;

    /// Merge `fields` (an object) into the node at `path`.
    async fn update(&self, path: &str, fields: &Value) -> Result<()>;
}

// ---------------------------------------------------------------------------
// REST client
// ---------------------------------------------------------------------------

pub struct RtdbClient {
    http: reqwest::Client,
    base: String,
    auth: Arc<dyn TokenSource>,
}

impl RtdbClient {
    pub fn new(
        database_url: &str,
        device_id: &str,
        timeout: Duration,
        auth: Arc<dyn TokenSource>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base: format!("{}/devices/{device_id}", database_url.trim_end_matches('/')),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base, path.trim_matches('/'))
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.auth.access_token().await?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn send(&self, req: RequestBuilder, method: &Method, path: &str) -> Result<reqwest::Response> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("{method} {path} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("{method} {path} returned {status}: {body}");
        }
        debug!(%method, path, %status, "rtdb request");
        Ok(resp)
    }
}

#[async_trait]
impl Store for RtdbClient {
    async fn get(&self, path: &str) -> Result<Value> {
        let req = self.request(Method::GET, path).await?;
        let resp = self.send(req, &Method::GET, path).await?;
        resp.json()
            .await
            .with_context(|| format!("invalid JSON at {path}"))
    }

    async fn set(&self, path: &str, value: &Value) -> Result<()> {
        let req = self.request(Method::PUT, path).await?.json(value);
        self.send(req, &Method::PUT, path).await?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: &Value) -> Result<()> {
        if !fields.is_object() {
            bail!("update of {path} needs an object, got {fields}");
        }
        let req = self.request(Method::PATCH, path).await?.json(fields);
        self.send(req, &Method::PATCH, path).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store (tests)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use serde_json::Map;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Write {
        Set(String, Value),
        Update(String, Value),
    }

    impl Write {
        pub fn path(&self) -> &str {
            match self {
                Write::Set(p, _) | Write::Update(p, _) => p,
            }
        }
    }

    /// A device subtree held in memory, recording every write.
    #[derive(Default)]
    pub struct MemoryStore {
        root: Mutex<Value>,
        writes: Mutex<Vec<Write>>,
        /// When set, every `get` fails.
        pub fail_reads: std::sync::atomic::AtomicBool,
        failing_paths: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        pub fn new(root: Value) -> Self {
            Self {
                root: Mutex::new(root),
                ..Default::default()
            }
        }

        pub fn writes(&self) -> Vec<Write> {
            self.writes.lock().unwrap().clone()
        }

        pub fn writes_to(&self, path: &str) -> Vec<Write> {
            self.writes().into_iter().filter(|w| w.path() == path).collect()
        }

        /// Make every later `get` of exactly `path` fail.
        pub fn fail_reads_of(&self, path: &str) {
            self.failing_paths.lock().unwrap().push(path.to_string());
        }

        pub fn snapshot(&self, path: &str) -> Value {
            let root = self.root.lock().unwrap();
            lookup(&root, path).cloned().unwrap_or(Value::Null)
        }

        /// Replace a node without recording it as a worker write.
        pub fn put(&self, path: &str, value: Value) {
            *node_mut(&mut self.root.lock().unwrap(), path) = value;
        }
    }

    fn segments(path: &str) -> impl Iterator<Item = &str> {
        path.split('/').filter(|s| !s.is_empty())
    }

    fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
        segments(path).try_fold(root, |node, seg| node.get(seg))
    }

    fn node_mut<'a>(root: &'a mut Value, path: &str) -> &'a mut Value {
        segments(path).fold(root, |node, seg| {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            match node {
                Value::Object(obj) => obj.entry(seg).or_insert(Value::Null),
                _ => unreachable!("node was just made an object"),
            }
        })
    }

    #[async_trait]
    impl Store for MemoryStore {
        async fn get(&self, path: &str) -> Result<Value> {
            if self.fail_reads.load(std::sync::atomic::Ordering::SeqCst)
                || self.failing_paths.lock().unwrap().iter().any(|p| p == path)
            {
                bail!("GET {path} returned 503 Service Unavailable: simulated");
            }
            Ok(self.snapshot(path))
        }

        async fn set(&self, path: &str, value: &Value) -> Result<()> {
            self.put(path, value.clone());
            self.writes
                .lock()
                .unwrap()
                .push(Write::Set(path.to_string(), value.clone()));
            Ok(())
        }

        async fn update(&self, path: &str, fields: &Value) -> Result<()> {
            let Some(fields_obj) = fields.as_object() else {
                bail!("update of {path} needs an object");
            };
            {
                let mut root = self.root.lock().unwrap();
                let node = node_mut(&mut root, path);
                for (k, v) in fields_obj {
                    *node_mut(&mut *node, k) = v.clone();
                }
            }
            self.writes
                .lock()
                .unwrap()
                .push(Write::Update(path.to_string(), fields.clone()));
            Ok(())
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
