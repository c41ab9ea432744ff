use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::math::Rgba;

/// A single demo parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl OptionValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            Self::Text(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            Self::Number(value) => Some(*value != 0.0),
            Self::Text(_) => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgba> {
        match self {
            Self::Text(text) => Rgba::from_hex(text),
            _ => None,
        }
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Rgba> for OptionValue {
    fn from(value: Rgba) -> Self {
        Self::Text(value.to_hex())
    }
}

/// Command line style parsing: `true`/`false`, then numbers, then text.
impl FromStr for OptionValue {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        Ok(match trimmed {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => trimmed
                .parse::<f64>()
                .map(Self::Number)
                .unwrap_or_else(|_| Self::Text(trimmed.to_string())),
        })
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Named demo parameters. Lookups that fail or have the wrong type fall back
/// to the supplied default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemoOptions {
    values: BTreeMap<String, OptionValue>,
}

impl DemoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str, default: f64) -> f64 {
        self.get(name)
            .and_then(OptionValue::as_number)
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    pub fn number_f32(&self, name: &str, default: f32) -> f32 {
        self.number(name, default as f64) as f32
    }

    /// Rounded, non-negative integer option.
    pub fn count(&self, name: &str, default: usize) -> usize {
        self.number(name, default as f64).round().max(0.0) as usize
    }

    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.get(name)
            .and_then(OptionValue::as_bool)
            .unwrap_or(default)
    }

    pub fn color(&self, name: &str, default: Rgba) -> Rgba {
        self.get(name)
            .and_then(OptionValue::as_color)
            .unwrap_or(default)
    }

    /// Shallow merge; entries in `overrides` win on key collision.
    pub fn merged(&self, overrides: &DemoOptions) -> DemoOptions {
        let mut values = self.values.clone();
        values.extend(
            overrides
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        DemoOptions { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for DemoOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = DemoOptions::new();
        for (k, v) in iter {
            options.set(k, v);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_wins_on_merge() {
        let defaults = DemoOptions::new().with("speed", 1.0).with("trails", true);
        let overrides = DemoOptions::new().with("speed", 3.0).with("extra", "x");

        let merged = defaults.merged(&overrides);
        assert_eq!(merged.number("speed", 0.0), 3.0);
        assert!(merged.flag("trails", false));
        assert_eq!(merged.get("extra"), Some(&OptionValue::Text("x".into())));
        assert_eq!(merged.len(), 3);
        // Merging does not touch the inputs.
        assert_eq!(defaults.number("speed", 0.0), 1.0);
    }

    #[test]
    fn typed_lookups_fall_back() {
        let options = DemoOptions::new()
            .with("name", "hello")
            .with("count", 7.6)
            .with("tint", "#102030");

        assert_eq!(options.number("name", 2.0), 2.0);
        assert_eq!(options.count("count", 0), 8);
        assert_eq!(options.color("tint", Rgba::BLACK), Rgba::rgb(16, 32, 48));
        assert_eq!(options.color("missing", Rgba::WHITE), Rgba::WHITE);
        assert!(!options.flag("missing", false));
    }

    #[test]
    fn parses_cli_values() {
        assert_eq!("true".parse::<OptionValue>().unwrap(), OptionValue::Bool(true));
        assert_eq!(" 2.5 ".parse::<OptionValue>().unwrap(), OptionValue::Number(2.5));
        assert_eq!(
            "#ff0000".parse::<OptionValue>().unwrap(),
            OptionValue::Text("#ff0000".into())
        );
    }

    #[test]
    fn deserializes_from_json() {
        let options: DemoOptions =
            serde_json::from_str(r##"{ "zoom": 2, "auto_zoom": true, "tint": "#fff" }"##).unwrap();
        assert_eq!(options.number("zoom", 0.0), 2.0);
        assert!(options.flag("auto_zoom", false));
        assert_eq!(options.color("tint", Rgba::BLACK), Rgba::WHITE);
    }
}
