//! Partial-field payloads for updates and staged edits

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::resource::Resource;
use super::validate::{Validate, ValidationError};

/// A partial overlay of field values, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPatch(Map<String, Value>);

impl FieldPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a patch from an arbitrary JSON value; only objects are accepted.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ValidationError::new("changes must be a JSON object")),
        }
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Overlay `other` onto `self`; later values win.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Reject patches that cannot be sent as an update.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::new("no changes to save"));
        }
        self.validate_fields()
    }

    /// Reject fields an update may not carry. An empty patch passes, since
    /// an attachment can be the whole change.
    pub fn validate_fields(&self) -> Result<(), ValidationError> {
        if self.0.contains_key("id") {
            return Err(ValidationError::new("id cannot be changed"));
        }
        if self.0.contains_key("status") {
            return Err(ValidationError::new(
                "status can only be changed through the status action",
            ));
        }
        Ok(())
    }

    /// Check the item this patch would produce against the rules its
    /// collection applies to new items.
    pub fn validate_against<R: Resource>(&self, base: &R) -> Result<(), ValidationError> {
        let unfit = |error: serde_json::Error| {
            ValidationError::new(format!("changes do not fit the item: {error}"))
        };
        let edited = serde_json::to_value(self.apply_to(base).map_err(unfit)?).map_err(unfit)?;
        let draft: R::Draft = serde_json::from_value(edited).map_err(unfit)?;
        draft.validate()
    }

    /// Render `base` with this patch applied, without touching `base`.
    pub fn apply_to<R: Resource>(&self, base: &R) -> Result<R, serde_json::Error> {
        let mut value = serde_json::to_value(base)?;
        if let Value::Object(fields) = &mut value {
            for (field, field_value) in &self.0 {
                fields.insert(field.clone(), field_value.clone());
            }
        }
        serde_json::from_value(value)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
