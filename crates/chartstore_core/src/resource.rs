//! Typed, identified, versioned domain records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The enumerated kind of a clinical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// A patient receiving care.
    Patient,
    /// A practitioner delivering care.
    Practitioner,
    /// An interaction between a patient and the healthcare system.
    Encounter,
    /// A measurement or assertion about a patient.
    Observation,
    /// A clinical condition or diagnosis.
    Condition,
    /// An order for medication.
    MedicationRequest,
}

impl ResourceType {
    /// Returns the canonical string form of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Encounter => "Encounter",
            ResourceType::Observation => "Observation",
            ResourceType::Condition => "Condition",
            ResourceType::MedicationRequest => "MedicationRequest",
        }
    }

    /// Parses a canonical string form back into a type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Patient" => Some(ResourceType::Patient),
            "Practitioner" => Some(ResourceType::Practitioner),
            "Encounter" => Some(ResourceType::Encounter),
            "Observation" => Some(ResourceType::Observation),
            "Condition" => Some(ResourceType::Condition),
            "MedicationRequest" => Some(ResourceType::MedicationRequest),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The composite identity of a record: `(type, logical id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// The resource type.
    pub resource_type: ResourceType,
    /// The logical id, unique within the type.
    pub logical_id: String,
}

impl ResourceKey {
    /// Creates a new key.
    pub fn new(resource_type: ResourceType, logical_id: impl Into<String>) -> Self {
        Self {
            resource_type,
            logical_id: logical_id.into(),
        }
    }

    /// Parses a `Type/id` reference string into a key.
    pub fn parse_reference(reference: &str) -> Option<Self> {
        let (type_str, id) = reference.split_once('/')?;
        let resource_type = ResourceType::parse(type_str)?;
        if id.is_empty() {
            return None;
        }
        Some(Self::new(resource_type, id))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.logical_id)
    }
}

/// A versioned domain record.
///
/// Multiple versions of the same identity may exist over time on the remote;
/// only one is current locally. `content` is the opaque resource body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// The resource type.
    pub resource_type: ResourceType,
    /// The logical id, unique within the type.
    pub logical_id: String,
    /// The remote version token, if known.
    pub version_id: Option<String>,
    /// The resource body.
    pub content: serde_json::Value,
}

impl Resource {
    /// Creates a new record with no version token.
    pub fn new(
        resource_type: ResourceType,
        logical_id: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self {
            resource_type,
            logical_id: logical_id.into(),
            version_id: None,
            content,
        }
    }

    /// Sets the remote version token.
    pub fn with_version(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Returns the composite identity of this record.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type, self.logical_id.clone())
    }

    /// Extracts the `Type/id` reference targets stored under a relation field.
    ///
    /// A relation field holds either one reference object or an array of
    /// them; each object carries a `reference` string. Unparseable entries
    /// are skipped.
    pub fn reference_targets(&self, relation: &str) -> Vec<ResourceKey> {
        let field = match self.content.get(relation) {
            Some(v) => v,
            None => return Vec::new(),
        };

        let items: Vec<&serde_json::Value> = match field {
            serde_json::Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        items
            .into_iter()
            .filter_map(|item| item.get("reference"))
            .filter_map(|r| r.as_str())
            .filter_map(ResourceKey::parse_reference)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_type_roundtrip() {
        for t in [
            ResourceType::Patient,
            ResourceType::Practitioner,
            ResourceType::Encounter,
            ResourceType::Observation,
            ResourceType::Condition,
            ResourceType::MedicationRequest,
        ] {
            assert_eq!(ResourceType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ResourceType::parse("Bogus"), None);
    }

    #[test]
    fn key_parse_reference() {
        let key = ResourceKey::parse_reference("Patient/p1").unwrap();
        assert_eq!(key.resource_type, ResourceType::Patient);
        assert_eq!(key.logical_id, "p1");

        assert!(ResourceKey::parse_reference("Patient").is_none());
        assert!(ResourceKey::parse_reference("Patient/").is_none());
        assert!(ResourceKey::parse_reference("Bogus/x").is_none());
    }

    #[test]
    fn reference_targets_single_and_array() {
        let obs = Resource::new(
            ResourceType::Observation,
            "o1",
            json!({ "subject": { "reference": "Patient/p1" } }),
        );
        assert_eq!(
            obs.reference_targets("subject"),
            vec![ResourceKey::new(ResourceType::Patient, "p1")]
        );

        let enc = Resource::new(
            ResourceType::Encounter,
            "e1",
            json!({
                "participant": [
                    { "reference": "Practitioner/d1" },
                    { "reference": "Practitioner/d2" },
                    { "reference": "garbage" }
                ]
            }),
        );
        assert_eq!(enc.reference_targets("participant").len(), 2);
        assert!(enc.reference_targets("missing").is_empty());
    }

    #[test]
    fn key_display() {
        let key = ResourceKey::new(ResourceType::Observation, "o9");
        assert_eq!(key.to_string(), "Observation/o9");
    }
}
