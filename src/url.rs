//! Archive URL parsing.
//!
//! Archive URLs have the shape `scheme://key[+version]/path[?query][#fragment]`.
//! The key is either a public key or a human readable name that still has to
//! go through name resolution.

use ::url::{ParseError, Url};

use crate::error::{FetchError, Result};

/// Schemes served from archives rather than passed through.
pub const ARCHIVE_SCHEMES: &[&str] = &["hyper", "dat"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveUrl {
    pub key: String,
    pub version: Option<String>,
    pub path: String,
}

impl ArchiveUrl {
    /// Parse an archive URL into key, version and path.
    ///
    /// The path is dot-segment normalized, has no leading slash and defaults
    /// to `/` when empty. Query and fragment are dropped.
    pub fn parse(url: &str) -> Result<Self> {
        let malformed = || FetchError::MalformedUrl(url.to_string());

        let parsed = Url::parse(url).map_err(|e| parse_error(url, e))?;
        let authority = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(malformed)?;

        let (key, version) = match authority.split_once('+') {
            Some((key, version)) => {
                let version = version.split('+').next().unwrap_or_default();
                (key, (!version.is_empty()).then(|| version.to_string()))
            }
            None => (authority, None),
        };
        if key.is_empty() {
            return Err(malformed());
        }

        let path = parsed.path();
        let path = match path.strip_prefix('/').unwrap_or(path) {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        Ok(Self {
            key: key.to_string(),
            version,
            path,
        })
    }
}

/// Return the scheme of `url` when it starts with `word://`.
///
/// This is a prefix test rather than a parse, so it also classifies
/// references that are not valid URLs on their own.
pub fn scheme_of(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once("://")?;
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    (!scheme.is_empty() && scheme.chars().all(is_word)).then_some(scheme)
}

pub fn is_archive_url(url: &str) -> bool {
    scheme_of(url).is_some_and(|scheme| ARCHIVE_SCHEMES.contains(&scheme))
}

/// Resolve a reference against an absolute base URL.
pub fn join(base: &str, reference: &str) -> Result<String> {
    let joined = Url::parse(base)
        .and_then(|base| base.join(reference))
        .map_err(|e| parse_error(reference, e))?;
    Ok(joined.into())
}

fn parse_error(url: &str, error: ParseError) -> FetchError {
    FetchError::MalformedUrl(format!("{url} ({error})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_version_and_path() {
        let url = ArchiveUrl::parse("hyper://abc123+5/a/b.txt").unwrap();
        assert_eq!(url.key, "abc123");
        assert_eq!(url.version.as_deref(), Some("5"));
        assert_eq!(url.path, "a/b.txt");
    }

    #[test]
    fn empty_path_defaults_to_root() {
        assert_eq!(ArchiveUrl::parse("hyper://abc").unwrap().path, "/");
        assert_eq!(ArchiveUrl::parse("dat://abc/").unwrap().path, "/");
        assert_eq!(ArchiveUrl::parse("hyper://abc?x=1").unwrap().path, "/");
    }

    #[test]
    fn strips_query_and_fragment() {
        let url = ArchiveUrl::parse("hyper://abc/dir/index.html?q=1#top").unwrap();
        assert_eq!(url.key, "abc");
        assert_eq!(url.version, None);
        assert_eq!(url.path, "dir/index.html");
    }

    #[test]
    fn rejects_urls_without_authority() {
        assert!(matches!(
            ArchiveUrl::parse("hyper:///file.txt"),
            Err(FetchError::MalformedUrl(_))
        ));
        assert!(ArchiveUrl::parse("hyper://+5/file.txt").is_err());
        assert!(ArchiveUrl::parse("not a url").is_err());
    }

    #[test]
    fn detects_archive_schemes() {
        assert!(is_archive_url("hyper://abc/"));
        assert!(is_archive_url("dat://abc/"));
        assert!(!is_archive_url("https://example.com/"));
        assert!(!is_archive_url("/relative/path"));
        assert_eq!(scheme_of("https://example.com"), Some("https"));
        assert_eq!(scheme_of("index.html"), None);
    }

    #[test]
    fn normalizes_dot_segments() {
        let url = ArchiveUrl::parse("hyper://abc/docs/../a.txt").unwrap();
        assert_eq!(url.path, "a.txt");
    }

    #[test]
    fn joins_relative_references() {
        let join = |base, reference| join(base, reference).unwrap();
        assert_eq!(join("hyper://abc/docs/", "a.txt"), "hyper://abc/docs/a.txt");
        assert_eq!(join("hyper://abc/docs/page.html", "b.txt"), "hyper://abc/docs/b.txt");
        assert_eq!(join("hyper://abc/docs/", "/root.txt"), "hyper://abc/root.txt");
    }

    #[test]
    fn joins_follow_reference_resolution_rules() {
        let join = |base, reference| join(base, reference).unwrap();
        assert_eq!(join("hyper://abc/docs/", "../hello.txt"), "hyper://abc/hello.txt");
        assert_eq!(join("hyper://abc/docs/", "//other/x.txt"), "hyper://other/x.txt");
        assert_eq!(
            join("hyper://abc/docs/page.html", "?v=2"),
            "hyper://abc/docs/page.html?v=2"
        );

        let url = ArchiveUrl::parse(&join("hyper://abc/docs/", "//other/x.txt")).unwrap();
        assert_eq!(url.key, "other");
        assert_eq!(url.path, "x.txt");
    }

    #[test]
    fn join_rejects_an_unparseable_base() {
        assert!(matches!(
            join("not a url", "a.txt"),
            Err(FetchError::MalformedUrl(_))
        ));
    }
}
