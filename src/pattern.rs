//! Route pattern parsing.
//!
//! A pattern is `[METHOD ]PATH`: an optional method token, one run of
//! whitespace, then the path template. The path template itself is opaque
//! here; only the mux understands `{param}` and `{*rest}` segments.
//!
//! ```text
//! "GET /users/{id}"   → (Some("GET"), "/users/{id}")
//! "/users/{id}"       → (None,        "/users/{id}")
//! "GET    /a b"       → (Some("GET"), "/a b")      ← split at the first run only
//! ```

/// Splits a pattern into its method token and path.
///
/// The method is everything before the first whitespace character and the
/// path is everything after that whitespace run. With no whitespace at all the
/// whole pattern is the path. A pattern that starts with whitespace yields
/// `Some("")`, which the mux treats the same as no method.
pub fn split_method_and_path(pattern: &str) -> (Option<&str>, &str) {
    match pattern.find(char::is_whitespace) {
        Some(at) => {
            let (method, rest) = pattern.split_at(at);
            (Some(method), rest.trim_start())
        }
        None => (None, pattern),
    }
}

/// Inserts `prefix` in front of the path component of `pattern`.
///
/// The method token, if any, stays in front. Prefix and path are concatenated
/// verbatim: `"/api/"` + `"/x"` gives `"/api//x"`, and the caller owns slash
/// consistency.
pub fn prefix_pattern(prefix: &str, pattern: &str) -> String {
    match split_method_and_path(pattern) {
        (Some(method), path) => format!("{method} {prefix}{path}"),
        (None, path) => format!("{prefix}{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_method_from_path() {
        assert_eq!(split_method_and_path("GET /hello"), (Some("GET"), "/hello"));
        assert_eq!(split_method_and_path("DELETE\t/users/{id}"), (Some("DELETE"), "/users/{id}"));
    }

    #[test]
    fn no_whitespace_means_no_method() {
        assert_eq!(split_method_and_path("/hello"), (None, "/hello"));
        assert_eq!(split_method_and_path(""), (None, ""));
    }

    #[test]
    fn splits_at_first_whitespace_run_only() {
        assert_eq!(split_method_and_path("GET   /a b"), (Some("GET"), "/a b"));
    }

    #[test]
    fn leading_whitespace_yields_empty_method() {
        assert_eq!(split_method_and_path(" /hello"), (Some(""), "/hello"));
    }

    #[test]
    fn prefix_goes_after_the_method() {
        assert_eq!(prefix_pattern("/api", "GET /hello"), "GET /api/hello");
        assert_eq!(prefix_pattern("/api", "POST   /hello"), "POST /api/hello");
    }

    #[test]
    fn prefix_without_method() {
        assert_eq!(prefix_pattern("/api", "/hello"), "/api/hello");
        assert_eq!(prefix_pattern("", "/hello"), "/hello");
    }

    #[test]
    fn slashes_are_not_normalised() {
        assert_eq!(prefix_pattern("/api/", "/hello/"), "/api//hello/");
        assert_eq!(prefix_pattern("/api", "hello"), "/apihello");
        assert_eq!(prefix_pattern("/", "GET api/hello"), "GET /api/hello");
    }

    #[test]
    fn nested_prefixes_are_associative() {
        let nested = prefix_pattern("/a", &prefix_pattern("/b", "GET /c"));
        assert_eq!(nested, prefix_pattern("/a/b", "GET /c"));
    }
}
