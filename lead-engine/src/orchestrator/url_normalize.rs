//! Identity-key normalisation for deduplication.
//!
//! Profile URLs, emails and names are reduced to canonical keys so that the
//! same person seen through different providers, or the same provider with
//! different link decorations, compares equal.

use url::Url;

/// Normalise a profile URL into a deduplication key.
///
/// Applies the following transformations:
///
/// 1. Trim whitespace; add `https://` when the scheme is missing.
/// 2. Treat `http` as `https`; lowercase host and path; drop a leading `www.`.
/// 3. Remove default ports, the query string and the fragment.
/// 4. Remove trailing slashes from the path.
///
/// Profile paths on the networks we see are case-insensitive, so unlike
/// general page URLs the path is lowercased too. Returns `None` for empty
/// input. Input that still fails to parse is lowercased with everything from
/// the first `?` or `#` removed.
///
/// # Examples
///
/// ```
/// use lead_engine::orchestrator::url_normalize::normalize_profile_url;
///
/// let a = normalize_profile_url("https://www.LinkedIn.com/in/JaneDoe/?trk=public");
/// let b = normalize_profile_url("linkedin.com/in/janedoe");
/// assert_eq!(a, b);
/// ```
pub fn normalize_profile_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let Ok(parsed) = Url::parse(&with_scheme) else {
        return Some(fallback_key(trimmed));
    };
    let Some(host) = parsed.host_str() else {
        return Some(fallback_key(trimmed));
    };

    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let port = match parsed.port() {
        Some(p) if !is_default_port(parsed.scheme(), p) => format!(":{p}"),
        _ => String::new(),
    };
    let path = parsed.path().trim_end_matches('/').to_lowercase();

    Some(format!("https://{host}{port}{path}"))
}

/// Normalise an email for exact matching: trimmed and lowercased.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    (!email.is_empty() && email.contains('@')).then_some(email)
}

/// Normalise a full name: case-folded with whitespace runs collapsed.
pub fn normalize_name(raw: &str) -> Option<String> {
    let name = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

/// Returns `true` if `port` is the default for `scheme`.
fn is_default_port(scheme: &str, port: u16) -> bool {
    matches!((scheme, port), ("http", 80) | ("https", 443))
}

fn fallback_key(raw: &str) -> String {
    let cut = raw.find(|c: char| c == '?' || c == '#').unwrap_or(raw.len());
    raw[..cut].trim_end_matches('/').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_host_and_path() {
        let result = normalize_profile_url("HTTPS://LinkedIn.COM/in/JaneDoe");
        assert_eq!(result.as_deref(), Some("https://linkedin.com/in/janedoe"));
    }

    #[test]
    fn strips_trailing_slash_and_query() {
        let result = normalize_profile_url("https://twitter.com/jane/?ref_src=twsrc");
        assert_eq!(result.as_deref(), Some("https://twitter.com/jane"));
    }

    #[test]
    fn strips_fragment() {
        let result = normalize_profile_url("https://github.com/jane#repos");
        assert_eq!(result.as_deref(), Some("https://github.com/jane"));
    }

    #[test]
    fn drops_www_and_unifies_scheme() {
        let a = normalize_profile_url("http://www.linkedin.com/in/jane");
        let b = normalize_profile_url("https://linkedin.com/in/jane");
        assert_eq!(a, b);
    }

    #[test]
    fn adds_missing_scheme() {
        let result = normalize_profile_url("linkedin.com/in/jane/");
        assert_eq!(result.as_deref(), Some("https://linkedin.com/in/jane"));
    }

    #[test]
    fn removes_default_port_keeps_others() {
        assert_eq!(
            normalize_profile_url("https://example.com:443/u/jane").as_deref(),
            Some("https://example.com/u/jane")
        );
        assert_eq!(
            normalize_profile_url("https://example.com:8443/u/jane").as_deref(),
            Some("https://example.com:8443/u/jane")
        );
    }

    #[test]
    fn root_url_has_no_trailing_slash() {
        assert_eq!(
            normalize_profile_url("https://jane.dev/").as_deref(),
            Some("https://jane.dev")
        );
    }

    #[test]
    fn empty_url_is_none() {
        assert_eq!(normalize_profile_url(""), None);
        assert_eq!(normalize_profile_url("   "), None);
    }

    #[test]
    fn unparseable_url_falls_back_to_lowercase_prefix() {
        let result = normalize_profile_url("not a url?x=1");
        assert_eq!(result.as_deref(), Some("not a url"));
    }

    #[test]
    fn email_normalisation() {
        assert_eq!(
            normalize_email("  Jane.Doe@Acme.COM ").as_deref(),
            Some("jane.doe@acme.com")
        );
        assert_eq!(normalize_email(""), None);
        assert_eq!(normalize_email("no-at-sign"), None);
    }

    #[test]
    fn name_normalisation_collapses_whitespace() {
        assert_eq!(
            normalize_name("  Jane \t  DOE ").as_deref(),
            Some("jane doe")
        );
        assert_eq!(normalize_name("   "), None);
    }
}
