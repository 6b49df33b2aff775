//! Route templates for spans, logs and metric labels.

use uuid::Uuid;

/// Segments followed by an approval token, which must never reach logs.
const TOKEN_PARENTS: [&str; 2] = ["approve", "reject"];

pub(super) fn route_template(path: &str) -> String {
    if path == "/" {
        return "/".to_owned();
    }

    let mut template = String::from("/");
    let mut previous = "";

    for (index, segment) in path.trim_start_matches('/').split('/').enumerate() {
        if index > 0 {
            template.push('/');
        }

        if TOKEN_PARENTS.contains(&previous) {
            template.push_str("{token}");
        } else if Uuid::parse_str(segment).is_ok() {
            template.push_str("{uuid}");
        } else {
            template.push_str(segment);
        }

        previous = segment;
    }

    template
}

#[cfg(test)]
mod tests {
    use super::route_template;

    #[test]
    fn uuids_are_collapsed() {
        assert_eq!(
            route_template("/consents/0190d9b2-8f3c-7a51-b1e4-3f0c2d9a7e11/revoke"),
            "/consents/{uuid}/revoke"
        );
    }

    #[test]
    fn approval_tokens_are_redacted() {
        assert_eq!(
            route_template("/consents/approve/9f2c41d0aa"),
            "/consents/approve/{token}"
        );
        assert_eq!(
            route_template("/consents/reject/9f2c41d0aa"),
            "/consents/reject/{token}"
        );
    }

    #[test]
    fn plain_routes_are_unchanged() {
        assert_eq!(route_template("/"), "/");
        assert_eq!(route_template("/audit/verify"), "/audit/verify");
    }
}
