//! Low-cardinality labels derived from a request.

use regex::Regex;

pub const WILDCARD: &str = "*";
pub const PARTNER_NONE: &str = "none";
pub const PARTNER_WILDCARD: &str = "wildcard";
pub const PARTNER_MANY: &str = "many";
pub const ENDPOINT_NOT_RECOGNIZED: &str = "not_recognized";

/// Collapse a token's partner list into a single label.
///
/// - empty list: `"none"`
/// - any `"*"` in the list: `"wildcard"`
/// - exactly one partner: that partner
/// - more than one partner: `"many"`
#[must_use]
pub fn determine_partner_metric<S: AsRef<str>>(partners: &[S]) -> String {
    match partners {
        [] => PARTNER_NONE.to_owned(),
        [only] if only.as_ref() == WILDCARD => PARTNER_WILDCARD.to_owned(),
        [only] => only.as_ref().to_owned(),
        many if many.iter().any(|p| p.as_ref() == WILDCARD) => PARTNER_WILDCARD.to_owned(),
        _ => PARTNER_MANY.to_owned(),
    }
}

/// Bucket a request path by the first endpoint pattern that matches at its start.
///
/// Patterns are tried in order and the first one whose leftmost match begins
/// at index 0 wins; its source text becomes the label. A path no pattern
/// matches at index 0 is labelled `"not_recognized"`.
#[must_use]
pub fn determine_endpoint_metric(endpoints: &[Regex], path: &str) -> String {
    endpoints
        .iter()
        .find(|r| r.find(path).is_some_and(|m| m.start() == 0))
        .map_or_else(|| ENDPOINT_NOT_RECOGNIZED.to_owned(), |r| r.as_str().to_owned())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn regexes(patterns: &[&str]) -> Vec<Regex> {
        patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
    }

    #[test]
    fn partner_classification() {
        let empty: [&str; 0] = [];
        assert_eq!(determine_partner_metric(&empty), "none");
        assert_eq!(determine_partner_metric(&["*"]), "wildcard");
        assert_eq!(determine_partner_metric(&["p1"]), "p1");
        assert_eq!(determine_partner_metric(&["p1", "*"]), "wildcard");
        assert_eq!(determine_partner_metric(&["p1", "p2"]), "many");
    }

    #[test]
    fn endpoint_first_prefix_match_wins() {
        let endpoints = regexes(&["^/a/", "^/b/"]);
        assert_eq!(determine_endpoint_metric(&endpoints, "/a/123"), "^/a/");
        assert_eq!(determine_endpoint_metric(&endpoints, "/b/9"), "^/b/");
        assert_eq!(determine_endpoint_metric(&endpoints, "/c/x"), "not_recognized");

        let overlapping = regexes(&["/api/v2/device", "/api/v2/"]);
        assert_eq!(
            determine_endpoint_metric(&overlapping, "/api/v2/device/mac:112233445566/stat"),
            "/api/v2/device"
        );
    }

    #[test]
    fn endpoint_match_must_start_at_zero() {
        let endpoints = regexes(&["device", "/api"]);
        assert_eq!(determine_endpoint_metric(&endpoints, "/api/device"), "/api");
        assert_eq!(determine_endpoint_metric(&[], "/api"), "not_recognized");
    }

    #[test]
    fn endpoint_matches_encoded_path() {
        let uri = http::Uri::from_static("/a%2Fb/c");
        let endpoints = regexes(&["^/a/b", "^/a%2Fb"]);
        assert_eq!(determine_endpoint_metric(&endpoints, uri.path()), "^/a%2Fb");
        assert_eq!(
            determine_endpoint_metric(&regexes(&["^/a/b"]), uri.path()),
            "not_recognized"
        );
    }

    #[test]
    fn labels_are_pure() {
        let endpoints = regexes(&["^/a/"]);
        assert_eq!(
            determine_endpoint_metric(&endpoints, "/a/1"),
            determine_endpoint_metric(&endpoints, "/a/1")
        );
        assert_eq!(
            determine_partner_metric(&["x", "y"]),
            determine_partner_metric(&["x", "y"])
        );
    }
}
