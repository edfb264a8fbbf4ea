//! Outbound request headers
//!
//! Many image hosts refuse requests that do not look like they come from a
//! browser, so every fetch carries the header set a desktop Chrome sends for
//! an `<img>` load, with Referer and Origin pointing at the source host.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use reqwest::Url;

pub const SERVICE_HEADER: &str = "railway-transform-v1";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const ACCEPT: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";

pub const SEC_CH_UA: &str = r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#;

const STATIC_HEADERS: &[(&str, &str)] = &[
    ("x-image-service", SERVICE_HEADER),
    ("user-agent", USER_AGENT),
    ("accept", ACCEPT),
    ("accept-language", "en-US,en;q=0.9"),
    ("accept-encoding", "gzip, deflate, br"),
    ("sec-ch-ua", SEC_CH_UA),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "image"),
    ("sec-fetch-mode", "no-cors"),
    ("sec-fetch-site", "cross-site"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
];

/// `<scheme>://<host[:port]>` of the source URL
pub fn base_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

/// Build the full header set for a fetch of `url`
pub fn browser_headers(url: &Url) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::with_capacity(STATIC_HEADERS.len() + 2);
    for (name, value) in STATIC_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    let base = base_url(url);
    headers.insert(
        reqwest::header::REFERER,
        HeaderValue::from_str(&format!("{}/", base))?,
    );
    headers.insert(reqwest::header::ORIGIN, HeaderValue::from_str(&base)?);

    Ok(headers)
}
