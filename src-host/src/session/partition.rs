// Named network session partitions
//
// A partition owns the proxy configuration, the outbound request-header
// rewrite and the cookie jar for one persistent browsing session. The host
// only ever touches partitions through the SessionPartition trait so the
// embedding shell can supply its own.

use super::cookies::{CookieKey, CookieRecord};
use crate::error::SessionError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;

/// Name of the partition cookies are persisted from
pub const DEFAULT_SESSION: &str = "default";

/// Outbound request headers, keyed by header name as sent
pub type RequestHeaders = BTreeMap<String, String>;

/// Rewrite applied to every intercepted outbound request
pub type HeaderRewrite = Arc<dyn Fn(&mut RequestHeaders) + Send + Sync>;

/// Proxy routing rule for a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRules(String);

impl ProxyRules {
    /// Route all traffic through a worker on the loopback interface
    pub fn localhost(port: u16) -> Self {
        Self(format!("localhost:{}", port))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Port of a `localhost:<port>` rule
    pub fn port(&self) -> Option<u16> {
        self.0.strip_prefix("localhost:")?.parse().ok()
    }
}

impl fmt::Display for ProxyRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait SessionPartition: Send + Sync {
    fn name(&self) -> &str;

    /// Replace the partition's proxy rule; resolves once the change is in effect
    async fn set_proxy(&self, rules: ProxyRules) -> Result<(), SessionError>;

    async fn proxy_rules(&self) -> Option<ProxyRules>;

    /// Replace (never stack) the outbound header rewrite
    async fn set_header_rewrite(&self, rewrite: HeaderRewrite) -> Result<(), SessionError>;

    /// Headers as they would leave the partition after the installed rewrite
    async fn rewrite_request_headers(&self, headers: RequestHeaders) -> RequestHeaders;

    async fn cookies(&self) -> Result<Vec<CookieRecord>, SessionError>;

    async fn set_cookie(&self, cookie: CookieRecord) -> Result<(), SessionError>;
}

#[derive(Default)]
struct PartitionState {
    proxy: Option<ProxyRules>,
    rewrite: Option<HeaderRewrite>,
    jar: Vec<CookieRecord>,
}

/// In-process partition used by the standalone host and in tests
pub struct MemorySession {
    name: String,
    state: Mutex<PartitionState>,
}

impl MemorySession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(PartitionState::default()),
        }
    }
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySession")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionPartition for MemorySession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn set_proxy(&self, rules: ProxyRules) -> Result<(), SessionError> {
        self.state.lock().await.proxy = Some(rules);
        Ok(())
    }

    async fn proxy_rules(&self) -> Option<ProxyRules> {
        self.state.lock().await.proxy.clone()
    }

    async fn set_header_rewrite(&self, rewrite: HeaderRewrite) -> Result<(), SessionError> {
        self.state.lock().await.rewrite = Some(rewrite);
        Ok(())
    }

    async fn rewrite_request_headers(&self, mut headers: RequestHeaders) -> RequestHeaders {
        let rewrite = self.state.lock().await.rewrite.clone();
        if let Some(rewrite) = rewrite {
            rewrite(&mut headers);
        }
        headers
    }

    async fn cookies(&self) -> Result<Vec<CookieRecord>, SessionError> {
        Ok(self.state.lock().await.jar.clone())
    }

    async fn set_cookie(&self, cookie: CookieRecord) -> Result<(), SessionError> {
        if cookie.name.is_empty() {
            return Err(SessionError::InvalidCookie {
                name: cookie.name,
                reason: "empty name",
            });
        }
        if cookie.domain.is_empty() {
            return Err(SessionError::InvalidCookie {
                name: cookie.name,
                reason: "missing domain",
            });
        }

        let key = CookieKey::of(&cookie);
        let mut state = self.state.lock().await;
        match state.jar.iter_mut().find(|c| CookieKey::of(c) == key) {
            Some(existing) => *existing = cookie,
            None => state.jar.push(cookie),
        }
        Ok(())
    }
}

/// Partitions by name; a name always resolves to the same shared partition
#[derive(Debug, Default)]
pub struct SessionRegistry {
    partitions: StdMutex<HashMap<String, Arc<MemorySession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared partition for `name`, created on first use
    pub fn from_partition(&self, name: &str) -> Arc<dyn SessionPartition> {
        let mut partitions = self
            .partitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let session = partitions
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemorySession::new(name)));
        Arc::clone(session) as Arc<dyn SessionPartition>
    }

    pub fn default_session(&self) -> Arc<dyn SessionPartition> {
        self.from_partition(DEFAULT_SESSION)
    }
}
