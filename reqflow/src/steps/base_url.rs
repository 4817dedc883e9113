//! Request step resolving relative URLs against a base.

use super::{SharedStep, Step, StepResult};
use crate::core::Request;
use crate::pipeline::PipelineState;
use std::sync::Arc;

/// Prefixes relative request URLs with a base URL.
///
/// URLs that already carry a scheme (`scheme://...`) are left alone.
#[derive(Debug, Clone)]
pub struct BaseUrl {
    base: String,
}

impl BaseUrl {
    /// Creates the step. A trailing slash on `base` is ignored.
    #[must_use]
    pub fn new(base: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the step ready for registration.
    #[must_use]
    pub fn shared(self) -> SharedStep<Request> {
        Arc::new(self)
    }

    fn resolve(&self, url: &str) -> Option<String> {
        if has_scheme(url) {
            return None;
        }
        Some(format!("{}/{}", self.base, url.trim_start_matches('/')))
    }
}

/// True when `url` starts with `scheme://`, where the scheme is one or more
/// ASCII alphanumerics, `+`, `-` or `.`.
fn has_scheme(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once(':') else {
        return false;
    };
    !scheme.is_empty()
        && scheme
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
        && rest.starts_with("//")
}

impl Step<Request> for BaseUrl {
    fn name(&self) -> &str {
        "base_url"
    }

    fn call(&self, mut request: Request, _state: &mut PipelineState) -> StepResult<Request> {
        if let Some(url) = self.resolve(&request.url) {
            request.url = url;
        }
        StepResult::Continue(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_urls_are_joined() {
        let step = BaseUrl::new("http://api.local/v1/");
        assert_eq!(step.resolve("users"), Some("http://api.local/v1/users".to_string()));
        assert_eq!(step.resolve("/users"), Some("http://api.local/v1/users".to_string()));
    }

    #[test]
    fn test_absolute_urls_are_kept() {
        let step = BaseUrl::new("http://api.local");
        assert_eq!(step.resolve("https://other.local/x"), None);
        assert_eq!(step.resolve("svn+ssh://repo.local/trunk"), None);
    }

    #[test]
    fn test_scheme_in_query_does_not_make_url_absolute() {
        let step = BaseUrl::new("http://api.example");
        assert_eq!(
            step.resolve("/login?next=http://x/home"),
            Some("http://api.example/login?next=http://x/home".to_string())
        );
        assert_eq!(
            step.resolve("search#http://x"),
            Some("http://api.example/search#http://x".to_string())
        );
        assert_eq!(
            step.resolve("files/a:b//c"),
            Some("http://api.example/files/a:b//c".to_string())
        );
    }
}
