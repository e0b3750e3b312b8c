//! # Filter Normalizer
//!
//! Turns the raw parameters of a read request into a [`CanonicalFilter`].
//! Anything that does not validate is dropped silently: an unknown key, a
//! malformed cursor or an out-of-range limit simply leaves the corresponding
//! field unset so the upstream default applies.
//!
//! ## Parameter shape
//!
//! | Key | Accepted values |
//! |---|---|
//! | `created` | integer, or `created[gt\|gte\|lt\|lte]` |
//! | `ending_before`, `starting_after` | `evt_` followed by alphanumerics |
//! | `limit` | integer in `(1, 100]` |
//! | `type` | any non-blank string |

use std::collections::BTreeMap;
use std::fmt;

/// Prefix carried by every upstream event identifier.
pub const EVENT_ID_PREFIX: &str = "evt_";

/// Smallest limit upstream will not accept from us (exclusive bound).
pub const LIMIT_MIN: u32 = 1;

/// Largest page size upstream accepts.
pub const LIMIT_MAX: u32 = 100;

const PERMITTED_SCALARS: &[&str] = &[
    "id",
    "created",
    "ending_before",
    "limit",
    "starting_after",
    "type",
];

/// Raw request parameters: top-level scalars plus nested operator maps.
///
/// A key may carry both a scalar and a nested map (`created=1` together with
/// `created[gte]=2`); the normalizer decides which one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    scalars: BTreeMap<String, String>,
    nested: BTreeMap<String, BTreeMap<String, String>>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse query-string style pairs, keeping only permitted keys.
    ///
    /// Bracketed keys (`created[gte]`) populate the nested map of their base
    /// key. Only `created` may be nested, and only with a range operator.
    /// Later duplicates overwrite earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();

        for (key, value) in pairs {
            let key = key.as_ref();

            match split_bracket_key(key) {
                Some((base, inner)) => {
                    if base == "created" && RangeOperator::from_key(inner).is_some() {
                        params.insert_nested(base, inner, value);
                    }
                }
                None => {
                    if PERMITTED_SCALARS.contains(&key) {
                        params.insert(key, value);
                    }
                }
            }
        }

        params
    }

    /// Set a scalar parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.scalars.insert(key.into(), value.into());
    }

    /// Set one entry of a nested operator map.
    pub fn insert_nested(
        &mut self,
        key: impl Into<String>,
        inner: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.nested
            .entry(key.into())
            .or_default()
            .insert(inner.into(), value.into());
    }

    /// Builder form of [`RawParams::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder form of [`RawParams::insert_nested`].
    pub fn with_nested(
        mut self,
        key: impl Into<String>,
        inner: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.insert_nested(key, inner, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.scalars.get(key).map(String::as_str)
    }

    pub fn get_nested(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        self.nested.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.nested.is_empty()
    }
}

fn split_bracket_key(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let inner = key[open + 1..].strip_suffix(']')?;
    if open == 0 || inner.is_empty() || inner.contains(['[', ']']) {
        return None;
    }
    Some((&key[..open], inner))
}

/// Comparison operator of a `created` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeOperator {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOperator {
    /// Selection order when several operators are supplied at once.
    pub const PRECEDENCE: [RangeOperator; 4] = [
        RangeOperator::Gt,
        RangeOperator::Gte,
        RangeOperator::Lt,
        RangeOperator::Lte,
    ];

    /// Parameter key for this operator (`gt`, `gte`, ...).
    pub fn as_key(&self) -> &'static str {
        match self {
            RangeOperator::Gt => "gt",
            RangeOperator::Gte => "gte",
            RangeOperator::Lt => "lt",
            RangeOperator::Lte => "lte",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::PRECEDENCE.into_iter().find(|op| op.as_key() == key)
    }
}

impl fmt::Display for RangeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Validated `created` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedFilter {
    Exact(i64),
    Range { op: RangeOperator, value: i64 },
}

/// Normalized read filter. Request scoped, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalFilter {
    pub created: Option<CreatedFilter>,
    pub ending_before: Option<String>,
    pub starting_after: Option<String>,
    pub limit: Option<u32>,
    pub event_type: Option<String>,
}

impl CanonicalFilter {
    /// Normalize raw parameters. Pure: the same input always yields the same
    /// filter, and invalid fragments are omitted rather than reported.
    pub fn from_params(params: &RawParams) -> Self {
        Self {
            created: normalize_created(params),
            ending_before: params
                .get("ending_before")
                .filter(|value| is_valid_event_id(value))
                .map(str::to_string),
            starting_after: params
                .get("starting_after")
                .filter(|value| is_valid_event_id(value))
                .map(str::to_string),
            limit: params.get("limit").and_then(normalize_limit),
            event_type: params
                .get("type")
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string),
        }
    }

    /// Copy of this filter positioned after the given cursor.
    ///
    /// An invalid cursor clears the position instead of carrying it forward.
    pub fn with_starting_after(&self, cursor: &str) -> Self {
        Self {
            starting_after: Some(cursor.to_string()).filter(|c| is_valid_event_id(c)),
            ..self.clone()
        }
    }

    /// Whether the filter constrains the local result set at all.
    pub fn has_local_constraints(&self) -> bool {
        self.created.is_some() || self.event_type.is_some()
    }
}

/// Free-function form of [`CanonicalFilter::from_params`].
pub fn normalize(params: &RawParams) -> CanonicalFilter {
    CanonicalFilter::from_params(params)
}

/// Whether `value` has the shape of an upstream event identifier.
///
/// Intentionally stricter than a prefix check: the suffix must be non-empty
/// ASCII alphanumerics. Every upstream id has that shape, and anything else
/// (separators, whitespace, non-ASCII) is dropped rather than forwarded as a
/// cursor.
pub fn is_valid_event_id(value: &str) -> bool {
    value
        .strip_prefix(EVENT_ID_PREFIX)
        .map(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(false)
}

fn normalize_created(params: &RawParams) -> Option<CreatedFilter> {
    if let Some(value) = params.get("created").and_then(parse_timestamp) {
        return Some(CreatedFilter::Exact(value));
    }

    let range = params.get_nested("created")?;
    let (op, raw) = RangeOperator::PRECEDENCE
        .into_iter()
        .find_map(|op| range.get(op.as_key()).map(|raw| (op, raw)))?;

    parse_timestamp(raw).map(|value| CreatedFilter::Range { op, value })
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn normalize_limit(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|limit| *limit > LIMIT_MIN && *limit <= LIMIT_MAX)
}
