//! Proxy utility functions.
//!
//! This module contains helper functions for request processing:
//! - Query parameter parsing
//! - Client IP detection (optionally X-Forwarded-For aware)
//! - Accept-Encoding negotiation and gzip compression

use std::collections::HashMap;
use std::io::Write;
use std::net::IpAddr;

use flate2::write::GzEncoder;
use flate2::Compression;
use pingora_http::RequestHeader;
use pingora_proxy::Session;

/// Extract query parameters from URI.
///
/// Keys and values are URL-decoded, `+` is read as a space. A key without
/// `=` maps to an empty value; on repeated keys the first one wins.
pub fn extract_query_params(req: &RequestHeader) -> HashMap<String, String> {
    parse_query(req.uri.query().unwrap_or(""))
}

pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(key))
            .or_insert_with(|| decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Client identity used for rate limiting.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` entry wins;
/// otherwise (or when the header is absent) the peer IP is used.
pub fn get_client_ip(session: &Session, trust_forwarded_for: bool) -> String {
    let forwarded_for = session
        .req_header()
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let peer = session
        .client_addr()
        .and_then(|addr| addr.as_inet())
        .map(|addr| addr.ip());

    resolve_client_ip(forwarded_for, peer, trust_forwarded_for)
}

pub fn resolve_client_ip(
    forwarded_for: Option<&str>,
    peer: Option<IpAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        // "client, proxy1, proxy2": the first entry is the original client
        if let Some(client_ip) = forwarded_for
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return client_ip.to_string();
        }
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Whether the Accept-Encoding header allows gzip
pub fn accepts_gzip(req: &RequestHeader) -> bool {
    req.headers
        .get("accept-encoding")
        .and_then(|v| v.to_str().ok())
        .map(accepts_gzip_value)
        .unwrap_or(false)
}

pub fn accepts_gzip_value(accept_encoding: &str) -> bool {
    accept_encoding.to_ascii_lowercase().contains("gzip")
}

pub fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}
