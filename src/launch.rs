//! Read-only launch parameters supplied by the host container

use std::collections::HashMap;

use bevy::ecs::resource::Resource;
use serde_json::Value;

use crate::BridgeError;

/// A primitive value attached to the application instance at launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// String value
    Str(String),
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        ExtraValue::Bool(value)
    }
}

impl From<i64> for ExtraValue {
    fn from(value: i64) -> Self {
        ExtraValue::Int(value)
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        ExtraValue::Str(value.to_owned())
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        ExtraValue::Str(value)
    }
}

/// Startup parameters of the application instance (intent extras on Android,
/// launch arguments on iOS).
///
/// Built once by the host and never mutated by the bridge afterwards. Lookups
/// of absent keys resolve to a caller-supplied default.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct LaunchContext {
    extras: HashMap<String, ExtraValue>,
}

impl LaunchContext {
    /// Creates an empty launch context
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an extra while the host is assembling the context
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Returns the raw extra stored under `key`
    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.extras.get(key)
    }

    /// Reads a boolean extra, falling back to `default` when the key is
    /// absent or holds a value of another type.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.extras.get(key) {
            Some(ExtraValue::Bool(value)) => *value,
            _ => default,
        }
    }

    /// Number of extras
    pub fn len(&self) -> usize {
        self.extras.len()
    }

    /// Whether the host supplied no extras at all
    pub fn is_empty(&self) -> bool {
        self.extras.is_empty()
    }

    /// Parses `-KEY value` launch arguments as passed to an iOS process.
    ///
    /// `YES`/`true`/`1` and `NO`/`false`/`0` become booleans, other integers
    /// become [`ExtraValue::Int`] and everything else is kept as a string. A
    /// `-`-prefixed token that is not an integer always starts a new key, so
    /// a key followed directly by another key has no value and is ignored,
    /// as are stray tokens.
    pub fn from_launch_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut context = Self::new();
        let mut pending_key: Option<String> = None;

        for arg in args {
            let arg = arg.as_ref();
            let new_key = arg
                .strip_prefix('-')
                .filter(|k| !k.is_empty() && arg.parse::<i64>().is_err());

            match (pending_key.take(), new_key) {
                (_, Some(key)) => pending_key = Some(key.to_owned()),
                (Some(key), None) => {
                    context.extras.insert(key, parse_launch_value(arg));
                }
                (None, None) => {}
            }
        }

        context
    }

    /// Parses a JSON object of primitive values, as handed over the C ABI
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Object(map) = value else {
            return Err(BridgeError::MalformedEnvelope(
                "launch extras must be a JSON object".to_owned(),
            ));
        };

        let mut context = Self::new();
        for (key, value) in map {
            let extra = match value {
                Value::Bool(b) => ExtraValue::Bool(b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => ExtraValue::Int(i),
                    None => return Err(BridgeError::InvalidExtra(key)),
                },
                Value::String(s) => ExtraValue::Str(s),
                _ => return Err(BridgeError::InvalidExtra(key)),
            };
            context.extras.insert(key, extra);
        }
        Ok(context)
    }
}

impl<K, V> FromIterator<(K, V)> for LaunchContext
where
    K: Into<String>,
    V: Into<ExtraValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            extras: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn parse_launch_value(raw: &str) -> ExtraValue {
    match raw {
        "YES" | "true" | "1" => ExtraValue::Bool(true),
        "NO" | "false" | "0" => ExtraValue::Bool(false),
        _ => match raw.parse::<i64>() {
            Ok(i) => ExtraValue::Int(i),
            Err(_) => ExtraValue::Str(raw.to_owned()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_uses_default() {
        let context = LaunchContext::new();
        assert!(!context.get_bool("DEMO_MODE", false));
        assert!(context.get_bool("DEMO_MODE", true));
    }

    #[test]
    fn wrong_type_uses_default() {
        let context = LaunchContext::new().with_extra("DEMO_MODE", "yes please");
        assert!(!context.get_bool("DEMO_MODE", false));
    }

    #[test]
    fn launch_args_are_paired() {
        let context = LaunchContext::from_launch_args([
            "/path/to/Runner",
            "-DEMO_MODE",
            "YES",
            "-FASTLANE_SNAPSHOT",
            "NO",
            "-AppleLanguages",
            "(en)",
            "-retries",
            "3",
            "-offset",
            "-2",
            "-valueless",
            "-NSDoubleLocalizedStrings",
            "YES",
            "-dangling",
        ]);

        assert!(context.get_bool("DEMO_MODE", false));
        assert!(!context.get_bool("FASTLANE_SNAPSHOT", true));
        assert_eq!(
            context.get("AppleLanguages"),
            Some(&ExtraValue::Str("(en)".into()))
        );
        assert_eq!(context.get("retries"), Some(&ExtraValue::Int(3)));
        assert_eq!(context.get("offset"), Some(&ExtraValue::Int(-2)));
        assert_eq!(context.get("valueless"), None);
        assert!(context.get_bool("NSDoubleLocalizedStrings", false));
        assert_eq!(context.get("dangling"), None);
        assert_eq!(context.len(), 6);
    }

    #[test]
    fn json_extras() {
        let context = LaunchContext::from_json(r#"{"DEMO_MODE": true, "n": 2, "s": "x"}"#)
            .expect("valid extras");
        assert!(context.get_bool("DEMO_MODE", false));
        assert_eq!(context.get("n"), Some(&ExtraValue::Int(2)));
        assert_eq!(context.get("s"), Some(&ExtraValue::Str("x".into())));
    }

    #[test]
    fn json_extras_reject_nested_values() {
        let err = LaunchContext::from_json(r#"{"DEMO_MODE": [true]}"#).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidExtra(key) if key == "DEMO_MODE"));

        let err = LaunchContext::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, BridgeError::MalformedEnvelope(_)));
    }
}
