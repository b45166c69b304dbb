//! Safe redirect targets.
//!
//! After a form is submitted users are often sent back where they came
//! from. The place they came from is user input though: a
//! `_redirect_target` field or the `Referer` header. [`get_redirect_target`]
//! only accepts targets on the current host (or hosts explicitly allowed),
//! never the current URL itself and never one of the targets the
//! application ruled out.

use regex::Regex;
use url::{Position, Url};

use crate::request::RequestInfo;

/// Checks a redirect target.
///
/// The candidate is `user_url` or, failing that, the referer. It is
/// rejected when:
///
/// - it points to a different scheme or host and the host matches none of
///   the current host and `allowed_rules` (shell patterns like
///   `*.example.com`),
/// - it points back to the current URL,
/// - it points to one of `invalid_targets`.
///
/// The accepted target is returned with leading slashes stripped; it is
/// resolved relative to the current URL.
///
/// ```
/// use fungiform_security::{get_redirect_target, RequestInfo};
///
/// let info = RequestInfo::new("http", "example.com").with_path_info("/form");
/// let none: &[&str] = &[];
/// assert_eq!(
///     get_redirect_target(&info, Some("/account"), none, none).as_deref(),
///     Some("account")
/// );
/// assert_eq!(get_redirect_target(&info, Some("http://evil.com/"), none, none), None);
/// ```
pub fn get_redirect_target<S: AsRef<str>>(
    info: &RequestInfo,
    user_url: Option<&str>,
    invalid_targets: &[S],
    allowed_rules: &[S],
) -> Option<String> {
    let candidate = user_url
        .filter(|url| !url.is_empty())
        .or_else(|| info.referer.as_deref().filter(|url| !url.is_empty()))?;
    let candidate = candidate.trim_start_matches('/');

    let current = Url::parse(&info.current_url(false)).ok()?;
    let Ok(check) = current.join(candidate) else {
        tracing::debug!(redirect = candidate, "rejected unparsable redirect target");
        return None;
    };

    if netloc(&current) != netloc(&check) || current.scheme() != check.scheme() {
        let host = check.host_str().unwrap_or_default();
        let current_host = info.host();
        let current_host = strip_port(&current_host);
        let allowed = std::iter::once(current_host)
            .chain(allowed_rules.iter().map(|rule| rule.as_ref()))
            .any(|rule| fnmatch(host, rule));
        if !allowed {
            tracing::debug!(redirect = candidate, host, "rejected redirect to foreign host");
            return None;
        }
    }

    if url_equals(&current, &check) {
        tracing::debug!(redirect = candidate, "rejected redirect to the current url");
        return None;
    }

    for invalid in invalid_targets {
        let Ok(invalid) = current.join(invalid.as_ref()) else {
            continue;
        };
        if url_equals(&invalid, &check) {
            tracing::debug!(redirect = candidate, "rejected invalid redirect target");
            return None;
        }
    }

    Some(candidate.to_string())
}

/// Matches a name against a shell pattern: `*` matches everything, `?` a
/// single character and `[seq]` / `[!seq]` a character class.
///
/// ```
/// use fungiform_security::redirects::fnmatch;
///
/// assert!(fnmatch("api.example.com", "*.example.com"));
/// assert!(fnmatch("a1.example.com", "a[0-9].example.com"));
/// assert!(!fnmatch("example.org", "*.example.com"));
/// ```
pub fn fnmatch(name: &str, pattern: &str) -> bool {
    Regex::new(&translate_pattern(pattern)).is_ok_and(|re| re.is_match(name))
}

fn translate_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str("\\[");
                } else {
                    let mut class: String = chars[i..j].iter().collect();
                    class = class.replace('\\', "\\\\");
                    if let Some(rest) = class.strip_prefix('!') {
                        class = format!("^{rest}");
                    } else if class.starts_with('^') {
                        class = format!("\\{class}");
                    }
                    out.push('[');
                    out.push_str(&class);
                    out.push(']');
                    i = j + 1;
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

fn netloc(url: &Url) -> &str {
    &url[Position::BeforeUsername..Position::AfterPort]
}

fn strip_port(host: &str) -> &str {
    host.rsplit_once(':')
        .filter(|(_, port)| port.bytes().all(|b| b.is_ascii_digit()))
        .map_or(host, |(name, _)| name)
}

/// Two URLs are equal when scheme, host and path match and every query
/// argument of `to_check` has the same value in `check`.
fn url_equals(to_check: &Url, check: &Url) -> bool {
    if to_check.scheme() != check.scheme()
        || netloc(to_check) != netloc(check)
        || to_check.path() != check.path()
    {
        return false;
    }
    let check_query: std::collections::HashMap<_, _> = query_args(check).collect();
    query_args(to_check).all(|(key, value)| check_query.get(&key) == Some(&value))
}

/// Query arguments without blank values.
fn query_args(url: &Url) -> impl Iterator<Item = (String, String)> + '_ {
    url.query_pairs()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
}
