use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};

/// A request accepted by [`HyperFetch::fetch`](crate::HyperFetch::fetch).
///
/// Plain URLs convert into a `GET` request without headers.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// `HEAD` in any letter case
    pub fn is_head(&self) -> bool {
        self.method.as_str().eq_ignore_ascii_case("HEAD")
    }
}

impl From<&str> for FetchRequest {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for FetchRequest {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}
