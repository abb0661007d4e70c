//! In-memory CloudFormation template
//!
//! A thin wrapper over the parsed JSON tree. Key order is preserved so the
//! emitted template diffs cleanly against the toolkit's own output.

use serde_json::{Map, Value};

use boundary_common::yaml::parse_document;
use boundary_common::{Error, Result};

const RESOURCES: &str = "Resources";
const PARAMETERS: &str = "Parameters";
const OUTPUTS: &str = "Outputs";
const PROPERTIES: &str = "Properties";

/// A CloudFormation template
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateDocument {
    root: Map<String, Value>,
}

impl TemplateDocument {
    /// An empty template with a `Resources` section
    pub fn empty() -> Self {
        let mut root = Map::new();
        root.insert(RESOURCES.to_string(), Value::Object(Map::new()));
        Self { root }
    }

    /// Wrap a parsed template.
    ///
    /// # Errors
    /// Returns a shape mismatch if the root is not an object or has no
    /// `Resources` object.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(root) = value else {
            return Err(Error::shape_mismatch(
                "<root>",
                "template root is not a mapping",
            ));
        };
        if !root.get(RESOURCES).is_some_and(Value::is_object) {
            return Err(Error::shape_mismatch(
                RESOURCES,
                "template has no Resources mapping",
            ));
        }
        Ok(Self { root })
    }

    /// Parse a template printed as JSON or YAML
    pub fn parse(text: &str) -> Result<Self> {
        let value = parse_document(text)
            .map_err(|e| Error::serialization_for_kind("template", e.to_string()))?;
        Self::from_value(value)
    }

    fn resources(&self) -> Option<&Map<String, Value>> {
        self.root.get(RESOURCES)?.as_object()
    }

    fn resources_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.root.get_mut(RESOURCES)?.as_object_mut()
    }

    /// Look up a resource by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources()?.get(logical_id)
    }

    /// Look up a resource mutably by logical id
    pub fn resource_mut(&mut self, logical_id: &str) -> Option<&mut Value> {
        self.resources_mut()?.get_mut(logical_id)
    }

    /// Logical ids of every resource with the given `Type`, in template order
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<String> {
        self.resources()
            .into_iter()
            .flatten()
            .filter(|(_, r)| r.get("Type").and_then(Value::as_str) == Some(resource_type))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of resources
    pub fn resource_count(&self) -> usize {
        self.resources().map_or(0, Map::len)
    }

    /// Add or replace a resource
    pub fn insert_resource(&mut self, logical_id: impl Into<String>, resource: Value) {
        if let Some(resources) = self.resources_mut() {
            resources.insert(logical_id.into(), resource);
        }
    }

    /// Set `Properties.<name>` on a resource, creating `Properties` if needed.
    ///
    /// # Errors
    /// Returns a shape mismatch if the resource is absent or malformed.
    pub fn set_property(&mut self, logical_id: &str, name: &str, value: Value) -> Result<()> {
        let resource = self
            .resource_mut(logical_id)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                Error::shape_mismatch(logical_id, "resource not found in template")
            })?;
        let properties = resource
            .entry(PROPERTIES)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| Error::shape_mismatch(logical_id, "Properties is not a mapping"))?;
        properties.insert(name.to_string(), value);
        Ok(())
    }

    /// Set the `Default` of a template parameter.
    ///
    /// # Errors
    /// Returns a shape mismatch if the parameter is not declared.
    pub fn set_parameter_default(&mut self, parameter: &str, value: Value) -> Result<()> {
        let declared = self
            .root
            .get_mut(PARAMETERS)
            .and_then(|p| p.get_mut(parameter))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                Error::shape_mismatch(
                    format!("{}.{}", PARAMETERS, parameter),
                    "parameter not declared",
                )
            })?;
        declared.insert("Default".to_string(), value);
        Ok(())
    }

    /// Top-level mapping section, created if absent or null
    fn section_mut(&mut self, name: &str) -> Result<&mut Map<String, Value>> {
        let section = self.root.entry(name).or_insert(Value::Null);
        if section.is_null() {
            *section = Value::Object(Map::new());
        }
        section
            .as_object_mut()
            .ok_or_else(|| Error::shape_mismatch(name, format!("{} is not a mapping", name)))
    }

    /// Declare a template parameter, replacing any earlier declaration.
    ///
    /// # Errors
    /// Returns a shape mismatch if `Parameters` exists and is not a mapping.
    pub fn add_parameter(&mut self, name: &str, declaration: Value) -> Result<()> {
        self.section_mut(PARAMETERS)?
            .insert(name.to_string(), declaration);
        Ok(())
    }

    /// Add a stack output.
    ///
    /// A bare `Outputs:` key (null) is treated as an empty section.
    ///
    /// # Errors
    /// Returns a shape mismatch if `Outputs` exists and is not a mapping.
    pub fn add_output(
        &mut self,
        name: &str,
        value: Value,
        description: Option<&str>,
    ) -> Result<()> {
        let outputs = self.section_mut(OUTPUTS)?;
        let mut output = Map::new();
        if let Some(description) = description {
            output.insert("Description".to_string(), Value::from(description));
        }
        output.insert("Value".to_string(), value);
        outputs.insert(name.to_string(), Value::Object(output));
        Ok(())
    }

    /// Look up a stack output value
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.root.get(OUTPUTS)?.get(name)?.get("Value")
    }

    /// Top-level section by name (e.g. "Conditions")
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.root.get(name)
    }

    /// Merge another template's sections into this one.
    ///
    /// Entries already present in `self` win; this mirrors including a
    /// template into a stack that owns its own resources. A null section on
    /// either side yields to the other.
    ///
    /// # Errors
    /// Returns a shape mismatch, leaving `self` untouched, if a section is a
    /// mapping on one side and some other value on the other.
    pub fn include(&mut self, other: TemplateDocument) -> Result<()> {
        for (section, incoming) in &other.root {
            let Some(existing) = self.root.get(section) else {
                continue;
            };
            let clash = match (existing, incoming) {
                (Value::Null, _) | (_, Value::Null) => false,
                (Value::Object(_), Value::Object(_)) => false,
                (Value::Object(_), _) | (_, Value::Object(_)) => true,
                _ => false,
            };
            if clash {
                return Err(Error::shape_mismatch(
                    section.as_str(),
                    "section has a different type in the included template",
                ));
            }
        }

        for (section, incoming) in other.root {
            match self.root.get_mut(&section) {
                Some(Value::Object(existing)) => {
                    if let Value::Object(incoming) = incoming {
                        for (key, entry) in incoming {
                            existing.entry(key).or_insert(entry);
                        }
                    }
                }
                Some(existing) if existing.is_null() => *existing = incoming,
                Some(_) => {}
                None => {
                    self.root.insert(section, incoming);
                }
            }
        }
        Ok(())
    }

    /// Borrow the whole tree
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Render as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.root)
            .map_err(|e| Error::serialization_for_kind("template", e.to_string()))
    }

    /// Consume into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TemplateDocument {
        TemplateDocument::from_value(json!({
            "Parameters": { "Qualifier": { "Type": "String", "Default": "hnb659fds" } },
            "Resources": {
                "Bucket": { "Type": "AWS::S3::Bucket" },
                "RoleA": { "Type": "AWS::IAM::Role", "Properties": {} },
                "RoleB": { "Type": "AWS::IAM::Role" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn rejects_non_mapping_root() {
        let err = TemplateDocument::from_value(json!(["not", "a", "template"])).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_missing_resources() {
        let err = TemplateDocument::from_value(json!({ "Description": "x" })).unwrap_err();
        assert_eq!(err.resource(), Some("Resources"));
    }

    #[test]
    fn parse_reports_serialization_error() {
        let err = TemplateDocument::parse("{ broken").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn finds_resources_by_type() {
        assert_eq!(sample().resources_of_type("AWS::IAM::Role"), vec!["RoleA", "RoleB"]);
        assert_eq!(sample().resource_count(), 3);
    }

    #[test]
    fn set_property_creates_properties() {
        let mut doc = sample();
        doc.set_property("RoleB", "PermissionsBoundary", json!("arn:x"))
            .unwrap();
        assert_eq!(
            doc.resource("RoleB").unwrap()["Properties"]["PermissionsBoundary"],
            "arn:x"
        );
    }

    #[test]
    fn set_property_on_missing_resource_fails() {
        let mut doc = sample();
        let err = doc
            .set_property("Missing", "PermissionsBoundary", json!("arn:x"))
            .unwrap_err();
        assert_eq!(err.resource(), Some("Missing"));
    }

    #[test]
    fn parameter_default_requires_declaration() {
        let mut doc = sample();
        doc.set_parameter_default("Qualifier", json!("abc")).unwrap();
        assert_eq!(
            doc.section("Parameters").unwrap()["Qualifier"]["Default"],
            "abc"
        );
        assert!(doc.set_parameter_default("Nope", json!("abc")).is_err());
    }

    #[test]
    fn outputs_round_trip() {
        let mut doc = TemplateDocument::empty();
        doc.add_output("BoundaryArn", json!("arn:y"), Some("boundary"))
            .unwrap();
        assert_eq!(doc.output("BoundaryArn"), Some(&json!("arn:y")));
        assert!(doc.output("Other").is_none());
    }

    #[test]
    fn include_keeps_existing_entries() {
        let mut doc = TemplateDocument::empty();
        doc.insert_resource("Bucket", json!({ "Type": "Mine" }));
        doc.include(sample()).unwrap();
        assert_eq!(doc.resource("Bucket").unwrap()["Type"], "Mine");
        assert!(doc.resource("RoleA").is_some());
        assert!(doc.section("Parameters").is_some());
    }

    #[test]
    fn bare_outputs_key_accepts_new_output() {
        let mut doc = TemplateDocument::from_value(json!({
            "Resources": {},
            "Outputs": null
        }))
        .unwrap();
        doc.add_output("BoundaryArn", json!("arn:y"), None).unwrap();
        assert_eq!(doc.output("BoundaryArn"), Some(&json!("arn:y")));
    }

    #[test]
    fn non_mapping_outputs_is_shape_mismatch() {
        let mut doc = TemplateDocument::from_value(json!({
            "Resources": {},
            "Outputs": "none"
        }))
        .unwrap();
        let err = doc.add_output("BoundaryArn", json!("arn:y"), None).unwrap_err();
        assert_eq!(err.resource(), Some("Outputs"));
    }

    #[test]
    fn include_fills_null_sections() {
        let mut doc = TemplateDocument::empty();
        doc.add_output("Mine", json!("x"), None).unwrap();
        let bare = TemplateDocument::from_value(json!({
            "Resources": {},
            "Outputs": null
        }))
        .unwrap();
        doc.include(bare).unwrap();
        assert_eq!(doc.output("Mine"), Some(&json!("x")));

        let mut doc = TemplateDocument::from_value(json!({
            "Resources": {},
            "Parameters": null
        }))
        .unwrap();
        doc.include(sample()).unwrap();
        assert!(doc.section("Parameters").unwrap().get("Qualifier").is_some());
    }

    #[test]
    fn include_reports_section_type_clash() {
        let mut doc = TemplateDocument::empty();
        doc.add_output("Mine", json!("x"), None).unwrap();
        let before = doc.clone();
        let clashing = TemplateDocument::from_value(json!({
            "Resources": { "Extra": { "Type": "AWS::SNS::Topic" } },
            "Outputs": ["not", "a", "mapping"]
        }))
        .unwrap();

        let err = doc.include(clashing).unwrap_err();
        assert_eq!(err.resource(), Some("Outputs"));
        assert_eq!(doc, before);
    }

    #[test]
    fn parameters_section_created_on_demand() {
        let mut doc = TemplateDocument::empty();
        doc.add_parameter("GithubToken", json!({ "Type": "String", "NoEcho": true }))
            .unwrap();
        assert_eq!(
            doc.section("Parameters").unwrap()["GithubToken"],
            json!({ "Type": "String", "NoEcho": true })
        );
        // Declared parameters can then be defaulted like any other
        doc.set_parameter_default("GithubToken", json!("")).unwrap();
    }
}
