// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource keys
//!
//! A key names one fetchable unit of data: a path plus optional query
//! parameters. Parameters are kept sorted so that two declarations of the
//! same path and parameters always produce the same key and the same
//! canonical string (`path?a=1&b=2`).
//!
//! `%` and the separators a component could be confused with are written as
//! `%XX`, so distinct keys never share a canonical string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for one cacheable unit of data
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    path: String,
    params: BTreeMap<String, String>,
}

/// Error parsing a canonical key string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("resource key path is empty")]
    EmptyPath,
    #[error("malformed query parameter in {key}: {param}")]
    MalformedParam { key: String, param: String },
    #[error("malformed escape in {key}: {component}")]
    MalformedEscape { key: String, component: String },
}

/// Characters escaped in the path
const PATH_RESERVED: &[char] = &['%', '?'];
/// Characters escaped in parameter names and values
const PARAM_RESERVED: &[char] = &['%', '&', '='];

fn write_escaped(f: &mut fmt::Formatter<'_>, raw: &str, reserved: &[char]) -> fmt::Result {
    for c in raw.chars() {
        if reserved.contains(&c) {
            write!(f, "%{:02X}", c as u32)?;
        } else {
            write!(f, "{c}")?;
        }
    }
    Ok(())
}

/// Decode `%XX` escapes. Only ASCII is ever escaped, so anything else is
/// rejected along with truncated or non-hex sequences.
fn unescape(component: &str) -> Option<String> {
    let mut out = String::with_capacity(component.len());
    let mut rest = component;
    while let Some(at) = rest.find('%') {
        out.push_str(&rest[..at]);
        let hex = rest
            .get(at + 1..at + 3)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))?;
        let byte = u8::from_str_radix(hex, 16).ok().filter(u8::is_ascii)?;
        out.push(char::from(byte));
        rest = &rest[at + 3..];
    }
    out.push_str(rest);
    Some(out)
}

impl ResourceKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.path, PATH_RESERVED)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            write_escaped(f, name, PARAM_RESERVED)?;
            f.write_str("=")?;
            write_escaped(f, value, PARAM_RESERVED)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, query) = match s.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (s, None),
        };
        let decode = |component: &str| {
            unescape(component).ok_or_else(|| KeyError::MalformedEscape {
                key: s.to_string(),
                component: component.to_string(),
            })
        };

        let path = decode(path)?;
        if path.is_empty() {
            return Err(KeyError::EmptyPath);
        }

        let mut key = ResourceKey::new(path);
        for param in query.into_iter().flat_map(|q| q.split('&')) {
            let Some((name, value)) = param.split_once('=') else {
                return Err(KeyError::MalformedParam {
                    key: s.to_string(),
                    param: param.to_string(),
                });
            };
            key.params.insert(decode(name)?, decode(value)?);
        }
        Ok(key)
    }
}

impl From<&str> for ResourceKey {
    /// Builds a bare-path key. Use `str::parse` for strings carrying parameters.
    fn from(path: &str) -> Self {
        ResourceKey::new(path)
    }
}

impl From<String> for ResourceKey {
    fn from(path: String) -> Self {
        ResourceKey::new(path)
    }
}

impl Serialize for ResourceKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
