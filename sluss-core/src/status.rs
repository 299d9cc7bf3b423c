//! `expected_http_status` patterns.
//!
//! Fixtures write either a bare status (`201`) or an alternation string
//! like `"(200|409)"`. The alternation is treated as an exact-match list
//! of numeric statuses, not as a regular expression.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Set of accepted HTTP statuses for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPattern(Vec<u16>);

impl StatusPattern {
    /// Pattern accepting exactly one status.
    pub fn exact(status: u16) -> Self {
        Self(vec![status])
    }

    /// Pattern accepting any of the given statuses.
    pub fn any_of(statuses: impl Into<Vec<u16>>) -> Self {
        Self(statuses.into())
    }

    pub fn matches(&self, status: u16) -> bool {
        self.0.contains(&status)
    }
}

impl std::str::FromStr for StatusPattern {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let inner = value
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')');
        let statuses: Result<Vec<u16>, _> = inner
            .split('|')
            .map(|part| {
                part.trim()
                    .parse::<u16>()
                    .map_err(|_| format!("invalid status pattern '{value}'"))
            })
            .collect();
        let statuses = statuses?;
        if statuses.is_empty() {
            return Err(format!("invalid status pattern '{value}'"));
        }
        Ok(Self(statuses))
    }
}

impl std::fmt::Display for StatusPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{single}"),
            many => {
                let parts: Vec<String> = many.iter().map(u16::to_string).collect();
                write!(f, "({})", parts.join("|"))
            }
        }
    }
}

impl Serialize for StatusPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct PatternVisitor;

impl Visitor<'_> for PatternVisitor {
    type Value = StatusPattern;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("an HTTP status or an alternation like \"(200|409)\"")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<StatusPattern, E> {
        u16::try_from(value)
            .map(StatusPattern::exact)
            .map_err(|_| E::custom(format!("status {value} out of range")))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<StatusPattern, E> {
        u16::try_from(value)
            .map(StatusPattern::exact)
            .map_err(|_| E::custom(format!("status {value} out of range")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<StatusPattern, E> {
        value.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for StatusPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PatternVisitor)
    }
}
