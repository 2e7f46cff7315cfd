use axum::http::{HeaderMap, Uri};
use restlayer_core::{key::DocumentKey, query::Expr};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// State threaded through the handling of one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Collection name as it appears in the path.
    pub plural: String,
    /// Singular form of the collection name.
    pub singular: String,
    /// Key addressed by the path, if any.
    pub key: Option<DocumentKey>,
    /// Whether responses are enveloped.
    pub envelope: bool,
    /// Absolute request URL, query included.
    pub url: String,
}

impl RequestContext {
    /// Criterion selecting the addressed document.
    pub fn criterion(&self) -> Option<Expr> {
        self.key.as_ref().map(DocumentKey::filter)
    }

    /// Request URL without its query string.
    pub fn location(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(base, _)| base)
    }
}

/// Reconstructs the absolute URL a client requested.
pub fn absolute_url(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))
        .unwrap_or("localhost");
    let path = uri
        .path_and_query()
        .map_or("/", |path| path.as_str());

    format!("{scheme}://{host}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn rebuilds_urls_behind_proxies() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("api.example.com"));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("https"));
        let uri: Uri = "/api/v1/users?limit=2".parse().unwrap();

        assert_eq!(absolute_url(&headers, &uri), "https://api.example.com/api/v1/users?limit=2");
        assert_eq!(absolute_url(&HeaderMap::new(), &uri), "http://localhost/api/v1/users?limit=2");
    }
}
