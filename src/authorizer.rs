// Source URL authorization
//
// Decides whether the gateway may fetch from the host named in the `url`
// query parameter. Stateless: the decision depends only on the URL and the
// configured allow-list.

use reqwest::Url;

use crate::error::GatewayError;

/// Outcome of an allow-list check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny,
}

/// Checks source URLs against the allowed domain list
#[derive(Debug, Clone)]
pub struct RequestAuthorizer {
    allowed_domains: Vec<String>,
}

impl RequestAuthorizer {
    pub fn new(allowed_domains: Vec<String>) -> Self {
        Self { allowed_domains }
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    /// Validate the raw `url` parameter and authorize its host
    ///
    /// Returns the parsed URL when the host is allowed.
    ///
    /// # Errors
    /// - `InvalidInput("Missing URL parameter")` if the parameter is absent or empty
    /// - `InvalidInput("Invalid URL")` if it has no parsable host
    /// - `AuthorizationDenied` if the host is not on the allow-list
    pub fn check(&self, raw_url: Option<&str>) -> Result<Url, GatewayError> {
        let raw = match raw_url {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Err(GatewayError::invalid_input("Missing URL parameter")),
        };

        let url = parse_source_url(raw)
            .ok_or_else(|| GatewayError::invalid_input("Invalid URL"))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| GatewayError::invalid_input("Invalid URL"))?;

        match self.decide(host) {
            AuthDecision::Allow => Ok(url),
            AuthDecision::Deny => {
                tracing::debug!(host = %host, "Source host not on allow-list");
                Err(GatewayError::AuthorizationDenied)
            }
        }
    }

    pub fn decide(&self, host: &str) -> AuthDecision {
        if is_domain_allowed(host, &self.allowed_domains) {
            AuthDecision::Allow
        } else {
            AuthDecision::Deny
        }
    }
}

/// Parse the `url` parameter, retrying once on its percent-decoded form
///
/// Only http and https sources with a host are accepted.
pub fn parse_source_url(raw: &str) -> Option<Url> {
    let accept = |url: Url| match url.scheme() {
        "http" | "https" if url.has_host() => Some(url),
        _ => None,
    };

    if let Some(url) = Url::parse(raw).ok().and_then(accept) {
        return Some(url);
    }

    let decoded = urlencoding::decode(raw)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Url::parse(&decoded).ok().and_then(accept)
}

/// Whether `host` matches any entry of `domains`
///
/// - `"*"` matches every host
/// - an entry matches itself exactly
/// - an entry matches any subdomain of itself (`img.example.com` for
///   `example.com`), but never a host that merely ends with the same
///   characters (`evilexample.com`)
///
/// Comparison is ASCII case-insensitive. Empty entries are ignored.
pub fn is_domain_allowed(host: &str, domains: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    for entry in domains {
        let entry = entry.trim();
        if entry == "*" {
            return true;
        }
        if entry.is_empty() {
            continue;
        }

        let entry = entry.trim_start_matches('.').to_ascii_lowercase();
        if host == entry {
            return true;
        }
        if host
            .strip_suffix(entry.as_str())
            .is_some_and(|rest| rest.ends_with('.'))
        {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case::wildcard(&["*"], "anything.io", true)]
    #[case::exact(&["example.com"], "example.com", true)]
    #[case::subdomain(&["example.com"], "img.example.com", true)]
    #[case::deep_subdomain(&["example.com"], "a.b.example.com", true)]
    #[case::suffix_without_dot(&["example.com"], "evilexample.com", false)]
    #[case::bare_dot_prefix(&["example.com"], ".example.com", true)]
    #[case::longer_entry_than_host(&["img.example.com"], "example.com", false)]
    #[case::other(&["example.com"], "example.org", false)]
    #[case::empty_entries_skipped(&["", " "], "example.com", false)]
    #[case::empty_list(&[], "example.com", false)]
    #[case::case_insensitive(&["Example.COM"], "IMG.example.com", true)]
    #[case::second_entry(&["cdn.net", "example.com"], "example.com", true)]
    fn test_is_domain_allowed(#[case] list: &[&str], #[case] host: &str, #[case] expected: bool) {
        assert_eq!(is_domain_allowed(host, &domains(list)), expected);
    }

    #[test]
    fn test_check_missing_url() {
        let authorizer = RequestAuthorizer::new(domains(&["*"]));
        let err = authorizer.check(None).unwrap_err();
        assert_eq!(err.body(), "Missing URL parameter");
        assert_eq!(err.status_code(), 400);

        let err = authorizer.check(Some("")).unwrap_err();
        assert_eq!(err.body(), "Missing URL parameter");
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://example.com/cat.jpg")]
    #[case("/relative/path.jpg")]
    fn test_check_invalid_url(#[case] raw: &str) {
        let authorizer = RequestAuthorizer::new(domains(&["*"]));
        let err = authorizer.check(Some(raw)).unwrap_err();
        assert_eq!(err.body(), "Invalid URL");
    }

    #[test]
    fn test_check_decodes_percent_encoded_url() {
        let authorizer = RequestAuthorizer::new(domains(&["example.com"]));
        let url = authorizer
            .check(Some("https%3A%2F%2Fimg.example.com%2Fcat.jpg"))
            .unwrap();
        assert_eq!(url.host_str(), Some("img.example.com"));
        assert_eq!(url.path(), "/cat.jpg");
    }

    #[test]
    fn test_check_ignores_port() {
        let authorizer = RequestAuthorizer::new(domains(&["localhost"]));
        assert!(authorizer.check(Some("http://localhost:8080/a.png")).is_ok());
    }

    #[test]
    fn test_check_denied_host() {
        let authorizer = RequestAuthorizer::new(domains(&["example.com"]));
        let err = authorizer
            .check(Some("https://evilexample.com/cat.jpg"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::AuthorizationDenied));
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.body(), "Domain not allowed");
    }
}
