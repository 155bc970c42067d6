//! Media query matching.
//!
//! The evaluator hands every at-rule that is neither `selector` nor
//! `colorScheme` to a [`MediaMatcher`]. Hosts with a full CSS media query
//! engine can plug their own; [`DefaultMediaMatcher`] covers the queries the
//! style compiler emits for breakpoints and orientation variants.

use crate::topics::Orientation;

/// Environment snapshot a media query is matched against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediaEnv<'a> {
    pub platform: &'a str,
    pub width: f64,
    pub height: f64,
    pub orientation: Orientation,
}

pub trait MediaMatcher {
    fn matches(&self, rule: &str, params: Option<&str>, env: &MediaEnv<'_>) -> bool;
}

impl<F> MediaMatcher for F
where
    F: Fn(&str, Option<&str>, &MediaEnv<'_>) -> bool,
{
    fn matches(&self, rule: &str, params: Option<&str>, env: &MediaEnv<'_>) -> bool {
        self(rule, params, env)
    }
}

/// Matches `@media` rules: comma-separated queries (OR) of `and`-joined
/// terms. Unknown features never match.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultMediaMatcher;

impl MediaMatcher for DefaultMediaMatcher {
    fn matches(&self, rule: &str, params: Option<&str>, env: &MediaEnv<'_>) -> bool {
        match (rule, params) {
            ("media", Some(query)) => match_query_list(query, env),
            _ => false,
        }
    }
}

fn match_query_list(list: &str, env: &MediaEnv<'_>) -> bool {
    list.split(',').any(|query| match_query(query, env))
}

fn match_query(query: &str, env: &MediaEnv<'_>) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return false;
    }
    let (negated, query) = match query.strip_prefix("not ") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, query.strip_prefix("only ").unwrap_or(query).trim_start()),
    };

    let matched = query
        .split(" and ")
        .map(str::trim)
        .all(|term| match_term(term, env));
    matched != negated
}

fn match_term(term: &str, env: &MediaEnv<'_>) -> bool {
    let Some(inner) = term.strip_prefix('(').and_then(|t| t.strip_suffix(')')) else {
        return match_media_type(term, env);
    };
    let (name, value) = match inner.split_once(':') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (inner.trim(), None),
    };

    let (bound, feature) = if let Some(f) = name.strip_prefix("min-") {
        (Bound::Min, f)
    } else if let Some(f) = name.strip_prefix("max-") {
        (Bound::Max, f)
    } else {
        (Bound::Exact, name)
    };

    match feature {
        "width" => compare_feature(bound, env.width, value.and_then(parse_length)),
        "height" => compare_feature(bound, env.height, value.and_then(parse_length)),
        "aspect-ratio" => {
            if env.height <= 0.0 {
                return false;
            }
            compare_feature(bound, env.width / env.height, value.and_then(parse_ratio))
        }
        "orientation" if bound == Bound::Exact => match value {
            Some(v) => v == env.orientation.as_str(),
            None => true,
        },
        _ => false,
    }
}

fn match_media_type(media_type: &str, env: &MediaEnv<'_>) -> bool {
    matches!(media_type, "all" | "screen") || media_type == env.platform
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
    Exact,
}

fn compare_feature(bound: Bound, actual: f64, expected: Option<f64>) -> bool {
    let Some(expected) = expected else {
        // `(width)` with no value: present and non-zero.
        return bound == Bound::Exact && actual > 0.0;
    };
    match bound {
        Bound::Min => actual >= expected,
        Bound::Max => actual <= expected,
        Bound::Exact => (actual - expected).abs() < f64::EPSILON,
    }
}

fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value);
    number.trim().parse().ok()
}

fn parse_ratio(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((w, h)) => {
            let w: f64 = w.trim().parse().ok()?;
            let h: f64 = h.trim().parse().ok()?;
            (h != 0.0).then(|| w / h)
        }
        None => value.trim().parse().ok(),
    }
}
