//! Routing a partition's traffic through the worker.

use super::partition::{HeaderRewrite, ProxyRules, RequestHeaders, SessionPartition};
use crate::error::SessionError;
use std::sync::Arc;

pub const ACCEPT_ENCODING_HEADER: &str = "Accept-Encoding";

/// Encodings advertised on every outbound request
pub const ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// The proxy rule currently applied to a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyBinding {
    pub partition: String,
    pub port: u16,
    pub rules: ProxyRules,
}

/// Header rewrite forcing `Accept-Encoding: gzip, deflate, br`.
///
/// Any existing spelling of the header is dropped first.
pub fn accept_encoding_rewrite() -> HeaderRewrite {
    Arc::new(|headers: &mut RequestHeaders| {
        headers.retain(|name, _| !name.eq_ignore_ascii_case(ACCEPT_ENCODING_HEADER));
        headers.insert(ACCEPT_ENCODING_HEADER.to_string(), ACCEPT_ENCODING.to_string());
    })
}

/// Point `session` at the worker listening on `port`.
///
/// Resolves once the partition has accepted the new proxy rule. Calling it
/// again replaces both the rule and the header rewrite.
pub async fn bind(session: &dyn SessionPartition, port: u16) -> Result<ProxyBinding, SessionError> {
    let rules = ProxyRules::localhost(port);

    session.set_header_rewrite(accept_encoding_rewrite()).await?;
    session.set_proxy(rules.clone()).await?;

    tracing::info!(partition = session.name(), proxy = %rules, "proxy bound");

    Ok(ProxyBinding {
        partition: session.name().to_string(),
        port,
        rules,
    })
}
