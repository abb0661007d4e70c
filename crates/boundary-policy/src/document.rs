//! IAM policy document types
//!
//! Statements serialize to the IAM JSON grammar: `Action` and `Resource`
//! collapse to a bare string when they hold one entry, empty sections are
//! omitted.

use std::collections::BTreeMap;

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::Value;

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Effect {
    /// Grant the listed actions
    Allow,
    /// Refuse the listed actions, overriding any Allow
    Deny,
}

/// Principal a trust statement applies to
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Principal {
    /// An IAM principal ARN or account
    #[serde(rename = "AWS")]
    Aws(String),
    /// An AWS service principal (e.g. `lambda.amazonaws.com`)
    Service(String),
}

/// Condition block: operator -> condition key -> value
pub type Conditions = BTreeMap<String, BTreeMap<String, Value>>;

/// Serializes a list as a bare string when it has exactly one entry
struct OneOrMany<'a>(&'a [String]);

impl Serialize for OneOrMany<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let [single] = self.0 {
            return serializer.serialize_str(single);
        }
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for item in self.0 {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

fn is_empty_str(s: &&str) -> bool {
    s.is_empty()
}

fn is_empty_conditions(c: &&Conditions) -> bool {
    c.is_empty()
}

/// A single IAM policy statement
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyStatement {
    /// Statement id
    pub sid: String,
    /// Allow or Deny
    pub effect: Effect,
    /// Actions, in emission order
    pub actions: Vec<String>,
    /// Resources, in emission order (empty for trust statements)
    pub resources: Vec<String>,
    /// Principal (trust statements only)
    pub principal: Option<Principal>,
    /// Condition block
    pub conditions: Conditions,
}

impl PolicyStatement {
    fn new(sid: impl Into<String>, effect: Effect) -> Self {
        Self {
            sid: sid.into(),
            effect,
            actions: Vec::new(),
            resources: Vec::new(),
            principal: None,
            conditions: Conditions::new(),
        }
    }

    /// Start an Allow statement
    pub fn allow(sid: impl Into<String>) -> Self {
        Self::new(sid, Effect::Allow)
    }

    /// Start a Deny statement
    pub fn deny(sid: impl Into<String>) -> Self {
        Self::new(sid, Effect::Deny)
    }

    /// Append actions, skipping duplicates
    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for action in actions {
            let action = action.into();
            if !self.actions.contains(&action) {
                self.actions.push(action);
            }
        }
        self
    }

    /// Append resources, skipping duplicates
    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for resource in resources {
            let resource = resource.into();
            if !self.resources.contains(&resource) {
                self.resources.push(resource);
            }
        }
        self
    }

    /// Set the principal
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Add a condition `operator: { key: value }`
    pub fn condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Look up a condition value
    pub fn condition_value(&self, operator: &str, key: &str) -> Option<&Value> {
        self.conditions.get(operator)?.get(key)
    }

    /// Render as a JSON value
    pub fn to_value(&self) -> Value {
        // Serializing plain strings and maps into a Value cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for PolicyStatement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Wire<'a> {
            #[serde(skip_serializing_if = "is_empty_str")]
            sid: &'a str,
            effect: Effect,
            #[serde(skip_serializing_if = "Option::is_none")]
            principal: Option<&'a Principal>,
            action: OneOrMany<'a>,
            #[serde(skip_serializing_if = "Option::is_none")]
            resource: Option<OneOrMany<'a>>,
            #[serde(skip_serializing_if = "is_empty_conditions")]
            condition: &'a Conditions,
        }

        Wire {
            sid: &self.sid,
            effect: self.effect,
            principal: self.principal.as_ref(),
            action: OneOrMany(&self.actions),
            resource: (!self.resources.is_empty()).then_some(OneOrMany(&self.resources)),
            condition: &self.conditions,
        }
        .serialize(serializer)
    }
}

/// An ordered list of statements forming one policy document
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PolicyDocument {
    /// Policy language version
    #[serde(rename = "Version")]
    pub version: &'static str,
    /// Statements, in emission order
    #[serde(rename = "Statement")]
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Create a document from statements
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statements,
        }
    }

    /// Find a statement by sid
    pub fn statement(&self, sid: &str) -> Option<&PolicyStatement> {
        self.statements.iter().find(|s| s.sid == sid)
    }

    /// Render as a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
