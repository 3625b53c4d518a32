//! Field descriptors and their registered form.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::collection::FieldsCollection;
use crate::error::Result;
use crate::serializer::{self, SharedSerializer};
use crate::types::{FieldName, FieldType, FieldValue, PrimitiveValue};

/// One entry of a list-shaped humanized value.
#[derive(Debug, Clone, PartialEq)]
pub struct HumanizedEntry {
    pub label: String,
    pub value: FieldValue,
}

/// Display form of a field value, used for active-filter chips.
#[derive(Debug, Clone, PartialEq)]
pub enum Humanized {
    Label(String),
    Entries(Vec<HumanizedEntry>),
}

/// Turns a value into a display label, with the whole collection at hand
/// for fields whose label depends on other fields.
pub type Humanizer = Arc<dyn Fn(&FieldValue, &FieldsCollection) -> Option<Humanized> + Send + Sync>;

/// A field descriptor, supplied at registration.
#[derive(Clone)]
pub struct Field {
    pub name: FieldName,
    pub field_type: FieldType,
    /// Initial value; becomes the registered field's default.
    pub value: FieldValue,
    /// Whether a `set` on this field triggers auto-submission.
    pub submittable: bool,
    pub serializer: SharedSerializer,
    pub humanize: Option<Humanizer>,
}

impl Field {
    /// A field using the built-in serializer for its type.
    ///
    /// Fails for types without a built-in serializer; use
    /// [`Field::with_serializer`] for those.
    pub fn new(name: impl Into<FieldName>, field_type: FieldType) -> Result<Self> {
        let serializer = serializer::resolve(field_type)?;
        Ok(Self::with_serializer(name, field_type, serializer))
    }

    /// A field with an explicit serializer.
    pub fn with_serializer(
        name: impl Into<FieldName>,
        field_type: FieldType,
        serializer: SharedSerializer,
    ) -> Self {
        let value = if field_type.is_array() {
            FieldValue::array(Vec::<FieldValue>::new())
        } else {
            FieldValue::Null
        };
        Self {
            name: name.into(),
            field_type,
            value,
            submittable: false,
            serializer,
            humanize: None,
        }
    }

    /// Set the initial (default) value.
    pub fn value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn submittable(mut self, submittable: bool) -> Self {
        self.submittable = submittable;
        self
    }

    pub fn humanize(
        mut self,
        humanize: impl Fn(&FieldValue, &FieldsCollection) -> Option<Humanized> + Send + Sync + 'static,
    ) -> Self {
        self.humanize = Some(Arc::new(humanize));
        self
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("value", &self.value)
            .field("submittable", &self.submittable)
            .field("humanize", &self.humanize.is_some())
            .finish()
    }
}

/// Partial metadata update applied by `FieldStore::update`.
///
/// Values are never changed through this path.
#[derive(Clone, Default)]
pub struct FieldOptions {
    pub submittable: Option<bool>,
    pub humanize: Option<Humanizer>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submittable(mut self, submittable: bool) -> Self {
        self.submittable = Some(submittable);
        self
    }

    pub fn humanize(
        mut self,
        humanize: impl Fn(&FieldValue, &FieldsCollection) -> Option<Humanized> + Send + Sync + 'static,
    ) -> Self {
        self.humanize = Some(Arc::new(humanize));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.submittable.is_none() && self.humanize.is_none()
    }
}

impl fmt::Debug for FieldOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOptions")
            .field("submittable", &self.submittable)
            .field("humanize", &self.humanize.is_some())
            .finish()
    }
}

/// A field as held by the store.
#[derive(Clone)]
pub struct RegisteredField {
    pub name: FieldName,
    pub field_type: FieldType,
    pub value: FieldValue,
    /// The value at registration time; `reset` restores it.
    pub default_value: FieldValue,
    pub submittable: bool,
    pub serializer: SharedSerializer,
    pub humanize: Option<Humanizer>,
    pub updated_at: Instant,
    /// True while an asynchronous unserialize is outstanding.
    pub is_hydrating: bool,
    pub(crate) hydration: u64,
}

impl RegisteredField {
    pub(crate) fn from_field(field: Field, value: FieldValue, is_hydrating: bool) -> Self {
        Self {
            name: field.name,
            field_type: field.field_type,
            default_value: field.value,
            value,
            submittable: field.submittable,
            serializer: field.serializer,
            humanize: field.humanize,
            updated_at: Instant::now(),
            is_hydrating,
            hydration: 0,
        }
    }

    /// The primitive form of the current value.
    pub fn serialize(&self) -> Option<PrimitiveValue> {
        self.serializer.serialize(&self.value)
    }

    /// Apply the field's humanizer, if any.
    pub fn humanized(&self, collection: &FieldsCollection) -> Option<Humanized> {
        self.humanize
            .as_ref()
            .and_then(|humanize| humanize(&self.value, collection))
    }

    /// Whether the current value differs (by identity) from the default.
    pub fn is_modified(&self) -> bool {
        !self.value.same_value(&self.default_value)
    }

    pub(crate) fn apply(&mut self, options: &FieldOptions) {
        if let Some(submittable) = options.submittable {
            self.submittable = submittable;
        }
        if let Some(humanize) = &options.humanize {
            self.humanize = Some(Arc::clone(humanize));
        }
        self.updated_at = Instant::now();
    }

    pub(crate) fn override_value(&mut self, value: FieldValue) {
        self.value = value;
        self.updated_at = Instant::now();
    }
}

impl fmt::Debug for RegisteredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredField")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("value", &self.value)
            .field("default_value", &self.default_value)
            .field("submittable", &self.submittable)
            .field("is_hydrating", &self.is_hydrating)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_field_resolves_serializer() {
        let field = Field::new("q", FieldType::String).unwrap().value("");
        assert_eq!(field.value, FieldValue::from(""));
        assert!(!field.submittable);
    }

    #[test]
    fn array_fields_default_to_empty_array() {
        let field = Field::new("tags", FieldType::StringArray).unwrap();
        assert_eq!(field.value.as_array().map(<[FieldValue]>::len), Some(0));
    }

    #[test]
    fn object_field_requires_serializer() {
        assert!(Field::new("filter", FieldType::Object).is_err());
    }

    #[test]
    fn empty_options_are_detected() {
        assert!(FieldOptions::new().is_empty());
        assert!(!FieldOptions::new().submittable(true).is_empty());
    }

    #[test]
    fn registered_field_tracks_modification() {
        let field = Field::new("status", FieldType::String).unwrap().value("");
        let mut registered = RegisteredField::from_field(field, FieldValue::from(""), false);
        assert!(!registered.is_modified());
        registered.override_value(FieldValue::from("active"));
        assert!(registered.is_modified());
        assert_eq!(registered.serialize(), Some(PrimitiveValue::from("active")));
    }

    #[test]
    fn apply_merges_options() {
        let field = Field::new("status", FieldType::String).unwrap();
        let mut registered = RegisteredField::from_field(field, FieldValue::Null, false);
        registered.apply(&FieldOptions::new().submittable(true));
        assert!(registered.submittable);
        assert!(registered.humanize.is_none());
    }
}
