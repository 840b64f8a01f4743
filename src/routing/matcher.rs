//! Route pattern matching and reverse URL building.
//!
//! # Responsibilities
//! - Match a route pattern against a concrete request path
//! - Extract `<name>` and greedy `<path:name>` variables
//! - Rebuild a URL from a pattern and variable values
//!
//! # Design Decisions
//! - Pure functions, no state
//! - Segment comparison is byte-exact (no decoding, no case folding)
//! - No regex: a segment is either a literal or a variable
//! - A variable binds whatever the path segment holds, including ""
//! - Greedy capture ends matching at the greedy segment. Literal segments
//!   after it in the pattern are never checked, so `/<path:p>/edit`
//!   matches `/a/b` with `p = "a/b"`.

use std::collections::HashMap;

use crate::routing::error::RoutingError;

/// Marker that turns a variable into a greedy capture: `<path:name>`.
const GREEDY_PREFIX: &str = "path:";
/// Older spelling of the greedy marker: `<name:path>`.
const GREEDY_SUFFIX: &str = ":path";

/// Variables captured from a request path, or supplied to [`encode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Builds params from `(name, value)` pairs. Values that count as absent
/// (see [`RouteValue`]) are skipped.
impl<K, V> FromIterator<(K, V)> for PathParams
where
    K: Into<String>,
    V: RouteValue,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = PathParams::new();
        for (name, value) in iter {
            if let Some(segment) = value.to_segment() {
                params.insert(name, segment);
            }
        }
        params
    }
}

/// A value that can fill a pattern variable during [`encode`].
///
/// Empty strings and zero numbers count as absent and make encoding fail
/// with [`RoutingError::MissingVariable`], same as a missing entry.
pub trait RouteValue {
    /// Rendered segment text, or `None` when the value counts as absent.
    fn to_segment(&self) -> Option<String>;
}

impl RouteValue for str {
    fn to_segment(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

impl RouteValue for String {
    fn to_segment(&self) -> Option<String> {
        self.as_str().to_segment()
    }
}

impl<T: RouteValue + ?Sized> RouteValue for &T {
    fn to_segment(&self) -> Option<String> {
        (**self).to_segment()
    }
}

impl<T: RouteValue> RouteValue for Option<T> {
    fn to_segment(&self) -> Option<String> {
        self.as_ref().and_then(RouteValue::to_segment)
    }
}

macro_rules! route_value_int {
    ($($t:ty),*) => {
        $(
            impl RouteValue for $t {
                fn to_segment(&self) -> Option<String> {
                    (*self != 0).then(|| self.to_string())
                }
            }
        )*
    };
}

route_value_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Outcome of one match attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    pub params: PathParams,
}

impl MatchResult {
    fn hit(params: PathParams) -> Self {
        Self { matched: true, params }
    }

    fn miss() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }

    /// Captured params when the pattern matched.
    pub fn into_params(self) -> Option<PathParams> {
        self.matched.then_some(self.params)
    }
}

/// One `/`-delimited piece of a route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Variable(&'a str),
    Greedy(&'a str),
    /// `<` without a closing `>` after it.
    Malformed,
}

impl<'a> Segment<'a> {
    fn parse(raw: &'a str) -> Self {
        let Some(open) = raw.find('<') else {
            return Segment::Literal(raw);
        };
        match raw.find('>') {
            Some(close) if close > open => {
                let inner = &raw[open + 1..close];
                if let Some(name) = inner.strip_prefix(GREEDY_PREFIX) {
                    Segment::Greedy(name)
                } else if let Some(name) = inner.strip_suffix(GREEDY_SUFFIX) {
                    Segment::Greedy(name)
                } else {
                    Segment::Variable(inner)
                }
            }
            _ => Segment::Malformed,
        }
    }
}

/// Match `pattern` against a request `path`.
///
/// Without a greedy variable both must have the same number of segments.
/// Malformed variable syntax never matches; it does not error.
pub fn match_route(pattern: &str, path: &str) -> MatchResult {
    let pattern_segments: Vec<Segment<'_>> = pattern.split('/').map(Segment::parse).collect();
    let path_segments: Vec<&str> = path.split('/').collect();

    let greedy = pattern_segments
        .iter()
        .any(|s| matches!(s, Segment::Greedy(_)));
    if !greedy && pattern_segments.len() != path_segments.len() {
        return MatchResult::miss();
    }

    let mut params = PathParams::new();
    for (idx, segment) in pattern_segments.iter().enumerate() {
        match *segment {
            Segment::Malformed => return MatchResult::miss(),
            Segment::Greedy(name) => {
                let rest = path_segments.get(idx..).unwrap_or_default().join("/");
                let rest = rest.strip_prefix('/').unwrap_or(&rest);
                params.insert(name, rest);
                return MatchResult::hit(params);
            }
            Segment::Variable(name) => match path_segments.get(idx) {
                Some(value) => params.insert(name, *value),
                None => return MatchResult::miss(),
            },
            Segment::Literal(literal) => {
                if path_segments.get(idx) != Some(&literal) {
                    return MatchResult::miss();
                }
            }
        }
    }

    MatchResult::hit(params)
}

/// Build a URL from `pattern` by substituting each variable with its value
/// in `params`. Literal segments pass through unchanged.
pub fn encode(pattern: &str, params: &PathParams) -> Result<String, RoutingError> {
    let mut parts = Vec::new();
    for raw in pattern.split('/') {
        match Segment::parse(raw) {
            Segment::Literal(literal) => parts.push(literal),
            Segment::Variable(name) | Segment::Greedy(name) => {
                let value = params
                    .get(name)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| RoutingError::MissingVariable(name.to_string()))?;
                parts.push(value);
            }
            Segment::Malformed => return Err(RoutingError::MalformedPattern(pattern.to_string())),
        }
    }
    Ok(parts.join("/"))
}

/// Names of all variables in `pattern`, in order of appearance.
pub fn pattern_variables(pattern: &str) -> Vec<&str> {
    pattern
        .split('/')
        .filter_map(|raw| match Segment::parse(raw) {
            Segment::Variable(name) | Segment::Greedy(name) => Some(name),
            _ => None,
        })
        .collect()
}
