//! Intent hashes: `#SemanticObject-action?name=value&name=value&/app/specific/route`.
//!
//! Parameters are kept in a sorted multimap so that two hashes naming the same parameters in a
//! different order compare equal and format identically.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use url::form_urlencoded;

use crate::{
    error::SiteError,
    site::{IntentTarget, TargetParameter},
};

static SO_ACTION: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^(?P<so>[A-Za-z0-9_.]+)-(?P<action>[A-Za-z0-9_]+)$"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Intent {
    pub semantic_object: String,
    pub action: String,
    pub parameters: BTreeMap<String, Vec<String>>,
    /// Stored without the leading `&/`.
    pub app_specific_route: Option<String>,
}

impl Intent {
    pub fn new<S: Into<String>, A: Into<String>>(semantic_object: S, action: A) -> Intent {
        Intent {
            semantic_object: semantic_object.into(),
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Intent {
        let values = self.parameters.entry(name.into()).or_default();
        let value = value.into();
        let at = values.partition_point(|v| *v <= value);
        values.insert(at, value);
        self
    }

    /// Parses `#SO-action...` (the leading `#` is optional).
    pub fn parse(hash: &str) -> Result<Intent, SiteError> {
        let body = hash.strip_prefix('#').unwrap_or(hash);
        let (body, route) = match body.find("&/") {
            Some(idx) => (&body[..idx], Some(&body[idx + 2..])),
            None => (body, None),
        };
        let (so_action, query) = match body.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (body, None),
        };
        let regex = SO_ACTION
            .as_ref()
            .map_err(|e| SiteError::Serialization(format!("Intent grammar failed to compile: {e}")))?;
        let caps = regex.captures(so_action).ok_or_else(|| {
            SiteError::invalid(format!(
                "'{hash}' is not an intent of the form #SemanticObject-action"
            ))
        })?;

        let mut intent = Intent::new(&caps["so"], &caps["action"]);
        if let Some(query) = query {
            for (name, value) in form_urlencoded::parse(query.as_bytes()) {
                intent
                    .parameters
                    .entry(name.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        }
        for values in intent.parameters.values_mut() {
            values.sort();
        }
        intent.app_specific_route = route.and_then(normalize_route);
        Ok(intent)
    }

    pub fn to_hash(&self) -> String {
        let mut hash = format!("#{}-{}", self.semantic_object, self.action);
        if !self.parameters.is_empty() {
            let mut query = form_urlencoded::Serializer::new(String::new());
            for (name, values) in self.parameters.iter() {
                for value in values {
                    query.append_pair(name, value);
                }
            }
            hash.push('?');
            hash.push_str(&query.finish());
        }
        if let Some(route) = &self.app_specific_route {
            hash.push_str("&/");
            hash.push_str(route);
        }
        hash
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hash())
    }
}

fn normalize_route(route: &str) -> Option<String> {
    let trimmed = route.trim_start_matches('&').trim_start_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl From<&IntentTarget> for Intent {
    fn from(target: &IntentTarget) -> Intent {
        let mut intent = Intent::new(&target.semantic_object, &target.action);
        for param in target.parameters.iter() {
            intent
                .parameters
                .entry(param.name.clone())
                .or_default()
                .push(param.value.clone());
        }
        for values in intent.parameters.values_mut() {
            values.sort();
        }
        intent.app_specific_route = target.app_specific_route.as_deref().and_then(normalize_route);
        intent
    }
}

impl From<&Intent> for IntentTarget {
    fn from(intent: &Intent) -> IntentTarget {
        IntentTarget {
            semantic_object: intent.semantic_object.clone(),
            action: intent.action.clone(),
            parameters: intent
                .parameters
                .iter()
                .flat_map(|(name, values)| {
                    values.iter().map(move |value| TargetParameter {
                        name: name.clone(),
                        value: value.clone(),
                    })
                })
                .collect(),
            app_specific_route: intent.app_specific_route.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn parses_parameters_and_route() {
        let intent = Intent::parse("#Sales-display?b=2&a=1&a=0&/detail/7").unwrap();
        assert_eq!(intent.semantic_object, "Sales");
        assert_eq!(intent.action, "display");
        assert_eq!(intent.parameters["a"], vec!["0", "1"]);
        assert_eq!(intent.parameters["b"], vec!["2"]);
        assert_eq!(intent.app_specific_route.as_deref(), Some("detail/7"));
    }

    #[test]
    fn parameter_order_does_not_matter() {
        let lhs = Intent::parse("#SO-action?x=1&y=2").unwrap();
        let rhs = Intent::parse("SO-action?y=2&x=1").unwrap();
        assert_eq!(lhs, rhs);
        assert_eq!(lhs.to_hash(), "#SO-action?x=1&y=2");
    }

    #[test]
    fn decodes_percent_escapes() {
        let intent = Intent::parse("#SO-action?name=a%20b").unwrap();
        assert_eq!(intent.parameters["name"], vec!["a b"]);
    }

    #[test]
    fn rejects_non_intents() {
        assert!(Intent::parse("https://example.com").is_err());
        assert!(Intent::parse("#justaword").is_err());
    }

    #[test]
    fn route_without_parameters() {
        let intent = Intent::parse("#SO-action&/orders").unwrap();
        assert!(intent.parameters.is_empty());
        assert_eq!(intent.to_hash(), "#SO-action&/orders");
    }

    #[test]
    fn built_intents_equal_their_parsed_form() {
        let built = Intent::new("SO", "action")
            .with_parameter("a", "2")
            .with_parameter("a", "1")
            .with_parameter("b", "0");
        assert_eq!(built, Intent::parse("#SO-action?b=0&a=1&a=2").unwrap());
        assert_eq!(built.to_hash(), "#SO-action?a=1&a=2&b=0");
    }

    #[test]
    fn target_conversion_keeps_parameters() {
        let intent = Intent::new("SO", "action").with_parameter("p", "v");
        let target = IntentTarget::from(&intent);
        assert_eq!(target.parameters.len(), 1);
        assert_eq!(Intent::from(&target), intent);
    }
}
