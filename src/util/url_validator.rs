use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating the content API base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP pointed at a non-loopback host.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureScheme,
    /// The URL carries a query string or fragment, which would corrupt joined paths.
    #[error("Base URL must not contain a query or fragment")]
    UnexpectedQuery,
    /// The URL has no host component.
    #[error("Base URL has no host")]
    MissingHost,
}

/// Validates the base URL of the content API.
///
/// The bearer token (if any) travels with every request, so plain HTTP is
/// only accepted for loopback hosts, which is what local test servers bind to.
///
/// The returned URL has its trailing slash stripped from the path so that
/// request paths can be appended with a single `/`.
///
/// # Examples
///
/// ```
/// use leadfeed::util::validate_base_url;
///
/// let url = validate_base_url("https://api.example.com/api/").unwrap();
/// assert_eq!(url.as_str(), "https://api.example.com/api");
///
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("http://api.example.com").is_err());
/// assert!(validate_base_url("ftp://api.example.com").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
            if !is_loopback_host(host) {
                return Err(UrlValidationError::InsecureScheme);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS base URL (loopback only)");
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlValidationError::UnexpectedQuery);
    }

    let trimmed = url.path().trim_end_matches('/').to_owned();
    url.set_path(&trimmed);
    Ok(url)
}

fn is_loopback_host(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
