// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

/// Named values substituted into file names.
///
/// Both `${NAME}` and `%%NAME%%` reference styles are recognized. A
/// reference to an undefined name is left in place.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the process environment
    pub fn from_env() -> Self {
        Self {
            values: std::env::vars().collect(),
        }
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let _ = self.values.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Replace every known variable reference in `text`
    #[must_use]
    pub fn substitute(&self, text: &str) -> String {
        let text = self.substitute_delimited(text, "${", "}");
        self.substitute_delimited(&text, "%%", "%%")
    }

    fn substitute_delimited(&self, text: &str, open: &str, close: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(open) {
            let after_open = &rest[start + open.len()..];
            let Some(end) = after_open.find(close) else {
                break;
            };
            let name = &after_open[..end];
            out.push_str(&rest[..start]);
            match self.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str(open);
                    out.push_str(name);
                    out.push_str(close);
                }
            }
            rest = &after_open[end + close.len()..];
        }
        out.push_str(rest);
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_both_styles() {
        let vars: Variables = [("DIR", "/data"), ("EXT", "csv")].into_iter().collect();
        assert_eq!(vars.substitute("${DIR}/in.%%EXT%%"), "/data/in.csv");
    }

    #[test]
    fn test_unknown_left_in_place() {
        let vars = Variables::new();
        assert_eq!(vars.substitute("${NOPE}/x"), "${NOPE}/x");
        assert_eq!(vars.substitute("unterminated ${DIR"), "unterminated ${DIR");
    }
}
