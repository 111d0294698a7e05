//! Rule engine - resolves one field value through mapping, rules, default
//!
//! # Resolution order (first match wins)
//!
//! 1. `value_mappings[lookup_key(value)]`
//! 2. `dynamic_rules`, in declared order
//! 3. `default`, when declared
//! 4. the raw value, unchanged
//!
//! Rule sets arrive as [`FieldRuleSet`] (the serde shape of a normalization
//! map entry) and are compiled once into [`CompiledRuleSet`]. Compilation is
//! where configuration errors surface; [`CompiledRuleSet::resolve`] itself
//! cannot fail.

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::canonical::lookup_key;
use crate::{Error, Result};

// ── Function registry ──────────────────────────────────────

/// Closed set of value transformations addressable by `apply_function`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    ToUppercase,
    ToLowercase,
    Trim,
    EmptyToNull,
}

impl Function {
    pub const ALL: [Function; 4] = [
        Function::ToUppercase,
        Function::ToLowercase,
        Function::Trim,
        Function::EmptyToNull,
    ];

    /// Look up a registered function by its symbolic name
    pub fn from_name(name: &str) -> Option<Function> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::ToUppercase => "to_uppercase",
            Function::ToLowercase => "to_lowercase",
            Function::Trim => "trim",
            Function::EmptyToNull => "empty_to_null",
        }
    }

    /// Apply the function. Non-string inputs pass through unchanged.
    pub fn apply(self, value: &Value) -> Value {
        let Value::String(s) = value else {
            return value.clone();
        };
        match self {
            Function::ToUppercase => Value::String(s.to_uppercase()),
            Function::ToLowercase => Value::String(s.to_lowercase()),
            Function::Trim => Value::String(s.trim().to_string()),
            Function::EmptyToNull if s.trim().is_empty() => Value::Null,
            Function::EmptyToNull => value.clone(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Serialized form ────────────────────────────────────────

/// One field's entry in a normalization map file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRuleSet {
    /// Lookup key → replacement value
    #[serde(default)]
    pub value_mappings: IndexMap<String, Value>,

    /// Ordered conditional rules, consulted after `value_mappings`
    #[serde(default)]
    pub dynamic_rules: Vec<RuleSpec>,

    /// Replacement used when nothing matched. Absent means none; an
    /// explicit `null` is a real default that nulls unmatched values.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
}

/// `Some` for any present value, `null` included
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// `{"if": {<operator>: <operand>}, "then": <action>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(rename = "if")]
    pub condition: IndexMap<String, Value>,

    #[serde(rename = "then", default)]
    pub action: Value,
}

// ── Compiled form ──────────────────────────────────────────

/// A validated rule condition
#[derive(Debug, Clone)]
pub enum Condition {
    /// `$in`: type-sensitive membership
    In(Vec<Value>),
    /// `$regex`: unanchored search over string values
    Regex(Regex),
    /// `apply_function`: `None` when the name is not registered, in which
    /// case the rule never matches
    Apply {
        name: String,
        function: Option<Function>,
    },
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub condition: Condition,
    pub action: Value,
}

impl Rule {
    /// Evaluate the rule; `Some(result)` when it matches
    pub fn evaluate(&self, value: &Value) -> Option<Value> {
        match &self.condition {
            Condition::In(members) => members
                .iter()
                .any(|member| same_value(member, value))
                .then(|| self.action.clone()),
            Condition::Regex(re) => match value {
                Value::String(s) if re.is_match(s) => Some(self.action.clone()),
                _ => None,
            },
            Condition::Apply { function, .. } => function.map(|f| f.apply(value)),
        }
    }
}

/// Type-sensitive equality with a single number type: `1` and `1.0` are equal
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() || y.is_f64() => {
            x.as_f64() == y.as_f64()
        }
        _ => a == b,
    }
}

/// Validated, ready-to-run rule set for one field
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleSet {
    value_mappings: IndexMap<String, Value>,
    rules: Vec<Rule>,
    default: Option<Value>,
}

impl CompiledRuleSet {
    /// Validate and compile `spec` for `field`.
    ///
    /// # Errors
    /// `InvalidRule` for an unknown operator, a condition with zero or
    /// several operators, or an operand of the wrong type.
    /// `InvalidPattern` when a `$regex` pattern does not compile.
    pub fn compile(field: &str, spec: &FieldRuleSet) -> Result<Self> {
        let rules = spec
            .dynamic_rules
            .iter()
            .enumerate()
            .map(|(index, rule)| compile_rule(field, index, rule))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            value_mappings: spec.value_mappings.clone(),
            rules,
            default: spec.default.clone(),
        })
    }

    /// Resolve a raw value. Total: never fails, never panics.
    pub fn resolve(&self, value: &Value) -> Value {
        if let Some(mapped) = self.value_mappings.get(&lookup_key(value)) {
            return mapped.clone();
        }

        if let Some(result) = self.rules.iter().find_map(|rule| rule.evaluate(value)) {
            return result;
        }

        match &self.default {
            Some(default) => default.clone(),
            None => value.clone(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

fn compile_rule(field: &str, index: usize, spec: &RuleSpec) -> Result<Rule> {
    let invalid = |message: String| Error::InvalidRule {
        field: field.to_string(),
        index,
        message,
    };

    let mut operators = spec.condition.iter();
    let (op, operand) = match (operators.next(), operators.next()) {
        (Some(entry), None) => entry,
        (None, _) => return Err(invalid("condition has no operator".into())),
        (Some(_), Some(_)) => {
            return Err(invalid(format!(
                "condition must have exactly one operator, found {}",
                spec.condition.len()
            )))
        }
    };

    let condition = match op.as_str() {
        "$in" => match operand {
            Value::Array(members) => Condition::In(members.clone()),
            other => return Err(invalid(format!("'$in' expects an array, found {}", other))),
        },
        "$regex" => {
            let Value::String(pattern) = operand else {
                return Err(invalid(format!("'$regex' expects a string, found {}", operand)));
            };
            let re = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
                field: field.to_string(),
                index,
                pattern: pattern.clone(),
                source,
            })?;
            Condition::Regex(re)
        }
        "apply_function" => {
            let Value::String(name) = operand else {
                return Err(invalid(format!(
                    "'apply_function' expects a function name, found {}",
                    operand
                )));
            };
            let function = Function::from_name(name);
            if function.is_none() {
                tracing::warn!(
                    field,
                    rule = index,
                    function = %name,
                    "unregistered function; rule will never match"
                );
            }
            Condition::Apply {
                name: name.clone(),
                function,
            }
        }
        other => return Err(invalid(format!("unknown operator '{}'", other))),
    };

    Ok(Rule {
        condition,
        action: spec.action.clone(),
    })
}
