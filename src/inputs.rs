//! Run inputs: the product idea and the values interpolated into task templates

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Printed when the user supplies no idea
pub const NO_IDEA_NOTICE: &str = "No product idea provided.";

/// A non-empty, trimmed product idea
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductIdea(String);

impl ProductIdea {
    /// Parse user input; `None` when it is empty or whitespace only
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Get the idea text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductIdea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named values available to `{placeholder}`s in task descriptions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewInputs {
    values: BTreeMap<String, Value>,
}

impl CrewInputs {
    /// Create empty inputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard inputs for a planning run: the idea plus the analysis flags
    pub fn for_idea(idea: &ProductIdea) -> Self {
        Self::new()
            .with("product_idea", idea.as_str())
            .with("market_analysis", true)
            .with("technology_assessment", true)
            .with("financial_projection", true)
    }

    /// Add a value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Replace `{name}` placeholders with input values.
    ///
    /// `{{` and `}}` produce literal braces. Placeholders without a matching
    /// input are left untouched.
    pub fn interpolate(&self, template: &str) -> String {
        placeholder()
            .replace_all(template, |caps: &Captures<'_>| {
                let Some(name) = caps.get(1) else {
                    return caps[0][..1].to_string();
                };
                match self.values.get(name.as_str()) {
                    Some(Value::String(text)) => text.clone(),
                    Some(other) => other.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder pattern")
    })
}
