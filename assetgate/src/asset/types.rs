//! Asset-type record and descriptor types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Externally visible description of a custom asset type.
///
/// This is what the model registry publishes; it is derived from an
/// [`AssetTypeRecord`] and carries no identity of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Display name of the asset type.
    pub name: String,

    /// Icon identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Hex colour used when rendering the asset type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,

    /// Free-form attribute definitions.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl AssetDescriptor {
    /// Create a descriptor with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            colour: None,
            attributes: Map::new(),
        }
    }

    /// Set the icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the colour.
    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }

    /// Add an attribute definition.
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

/// A stored custom asset type.
///
/// The identifier is fixed at creation; records are never updated in place,
/// only deleted and recreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetTypeRecord {
    id: String,
    descriptor: AssetDescriptor,
}

impl AssetTypeRecord {
    /// Create a record.
    pub fn new(id: impl Into<String>, descriptor: AssetDescriptor) -> Self {
        Self {
            id: id.into(),
            descriptor,
        }
    }

    /// The record identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The descriptor payload.
    pub fn descriptor(&self) -> &AssetDescriptor {
        &self.descriptor
    }
}
