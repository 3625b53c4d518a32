//! Serializers between typed field values and primitive wire values.
//!
//! Every serializer is total: malformed input unserializes to `None`
//! ("use the default") instead of failing. A serializer may also answer
//! with [`Unserialized::Deferred`] when resolving the typed value needs
//! asynchronous work, such as a network lookup.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::{HydrationError, Result, StoreError};
use crate::types::{FieldType, FieldValue, PrimitiveValue};

/// Outcome of a deferred unserialize.
pub type HydrationResult = std::result::Result<Option<FieldValue>, HydrationError>;

/// Result of unserializing a primitive value.
pub enum Unserialized {
    /// Resolved synchronously; `None` means malformed or absent.
    Ready(Option<FieldValue>),
    /// Resolved later by the future.
    Deferred(BoxFuture<'static, HydrationResult>),
}

impl Unserialized {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Unserialized::Deferred(_))
    }
}

impl fmt::Debug for Unserialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unserialized::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Unserialized::Deferred(_) => f.debug_tuple("Deferred").field(&"<future>").finish(),
        }
    }
}

/// Converts a field's value to and from its primitive form.
pub trait Serializer: Send + Sync {
    /// `None` when the value has no primitive form (e.g. `Null`).
    fn serialize(&self, value: &FieldValue) -> Option<PrimitiveValue>;

    fn unserialize(&self, primitive: &PrimitiveValue) -> Unserialized;
}

/// Shared handle to a serializer.
pub type SharedSerializer = Arc<dyn Serializer>;

/// Synchronous serializer for a single string, composable into arrays.
pub trait ScalarSerializer: Send + Sync {
    fn serialize_scalar(&self, value: &FieldValue) -> Option<String>;

    fn unserialize_scalar(&self, raw: &str) -> Option<FieldValue>;
}

macro_rules! scalar_serializer {
    ($ty:ty) => {
        impl Serializer for $ty {
            fn serialize(&self, value: &FieldValue) -> Option<PrimitiveValue> {
                self.serialize_scalar(value).map(PrimitiveValue::Single)
            }

            fn unserialize(&self, primitive: &PrimitiveValue) -> Unserialized {
                Unserialized::Ready(
                    primitive
                        .first()
                        .and_then(|raw| self.unserialize_scalar(raw)),
                )
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl ScalarSerializer for StringSerializer {
    fn serialize_scalar(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Null => None,
            FieldValue::String(value) => Some(value.clone()),
            other => Some(other.to_string()),
        }
    }

    fn unserialize_scalar(&self, raw: &str) -> Option<FieldValue> {
        Some(FieldValue::String(raw.to_string()))
    }
}

/// Decimal and exponent forms plus `Infinity`. Hex, octal and binary
/// literals such as `0x10` are not numbers here and unserialize to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberSerializer;

impl ScalarSerializer for NumberSerializer {
    fn serialize_scalar(&self, value: &FieldValue) -> Option<String> {
        value.as_f64().map(format_number)
    }

    fn unserialize_scalar(&self, raw: &str) -> Option<FieldValue> {
        parse_number(raw).map(FieldValue::Number)
    }
}

/// Total mapping: `"true"` is `true`, every other string is `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanSerializer;

impl ScalarSerializer for BooleanSerializer {
    fn serialize_scalar(&self, value: &FieldValue) -> Option<String> {
        value.as_bool().map(|value| value.to_string())
    }

    fn unserialize_scalar(&self, raw: &str) -> Option<FieldValue> {
        Some(FieldValue::Boolean(raw == "true"))
    }
}

/// ISO-8601 out; epoch milliseconds or a date string in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateSerializer;

impl ScalarSerializer for DateSerializer {
    fn serialize_scalar(&self, value: &FieldValue) -> Option<String> {
        value
            .as_date()
            .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn unserialize_scalar(&self, raw: &str) -> Option<FieldValue> {
        parse_date(raw).map(FieldValue::Date)
    }
}

scalar_serializer!(StringSerializer);
scalar_serializer!(NumberSerializer);
scalar_serializer!(BooleanSerializer);
scalar_serializer!(DateSerializer);

/// Element-wise composition of a scalar serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArraySerializer<S> {
    inner: S,
}

impl<S: ScalarSerializer> ArraySerializer<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: ScalarSerializer> Serializer for ArraySerializer<S> {
    fn serialize(&self, value: &FieldValue) -> Option<PrimitiveValue> {
        let values = value.as_array()?;
        Some(PrimitiveValue::Many(
            values
                .iter()
                .filter_map(|value| self.inner.serialize_scalar(value))
                .collect(),
        ))
    }

    fn unserialize(&self, primitive: &PrimitiveValue) -> Unserialized {
        let values: Vec<FieldValue> = primitive
            .as_list()
            .into_iter()
            .filter_map(|raw| self.inner.unserialize_scalar(raw))
            .collect();
        Unserialized::Ready(Some(FieldValue::array(values)))
    }
}

/// Resolve the built-in serializer for a field type.
///
/// `object` and `object[]` have no canonical wire form and must be given
/// an explicit serializer.
pub fn resolve(field_type: FieldType) -> Result<SharedSerializer> {
    let serializer: SharedSerializer = match field_type {
        FieldType::String => Arc::new(StringSerializer),
        FieldType::Number => Arc::new(NumberSerializer),
        FieldType::Boolean => Arc::new(BooleanSerializer),
        FieldType::Date => Arc::new(DateSerializer),
        FieldType::StringArray => Arc::new(ArraySerializer::new(StringSerializer)),
        FieldType::NumberArray => Arc::new(ArraySerializer::new(NumberSerializer)),
        FieldType::BooleanArray => Arc::new(ArraySerializer::new(BooleanSerializer)),
        FieldType::DateArray => Arc::new(ArraySerializer::new(DateSerializer)),
        FieldType::Object | FieldType::ObjectArray => {
            return Err(StoreError::UnsupportedType {
                type_name: field_type.tag().to_string(),
            })
        }
    };
    Ok(serializer)
}

/// Serializer built from two synchronous closures.
pub struct FnSerializer<S, U> {
    serialize: S,
    unserialize: U,
}

impl<S, U> Serializer for FnSerializer<S, U>
where
    S: Fn(&FieldValue) -> Option<PrimitiveValue> + Send + Sync,
    U: Fn(&PrimitiveValue) -> Option<FieldValue> + Send + Sync,
{
    fn serialize(&self, value: &FieldValue) -> Option<PrimitiveValue> {
        (self.serialize)(value)
    }

    fn unserialize(&self, primitive: &PrimitiveValue) -> Unserialized {
        Unserialized::Ready((self.unserialize)(primitive))
    }
}

/// Custom synchronous serializer.
pub fn from_fn<S, U>(serialize: S, unserialize: U) -> SharedSerializer
where
    S: Fn(&FieldValue) -> Option<PrimitiveValue> + Send + Sync + 'static,
    U: Fn(&PrimitiveValue) -> Option<FieldValue> + Send + Sync + 'static,
{
    Arc::new(FnSerializer {
        serialize,
        unserialize,
    })
}

/// Serializer whose unserialize always resolves asynchronously.
pub struct DeferredSerializer<S, U> {
    serialize: S,
    unserialize: U,
}

impl<S, U, F> Serializer for DeferredSerializer<S, U>
where
    S: Fn(&FieldValue) -> Option<PrimitiveValue> + Send + Sync,
    U: Fn(PrimitiveValue) -> F + Send + Sync,
    F: Future<Output = HydrationResult> + Send + 'static,
{
    fn serialize(&self, value: &FieldValue) -> Option<PrimitiveValue> {
        (self.serialize)(value)
    }

    fn unserialize(&self, primitive: &PrimitiveValue) -> Unserialized {
        Unserialized::Deferred((self.unserialize)(primitive.clone()).boxed())
    }
}

/// Custom serializer backed by an asynchronous lookup.
pub fn deferred<S, U, F>(serialize: S, unserialize: U) -> SharedSerializer
where
    S: Fn(&FieldValue) -> Option<PrimitiveValue> + Send + Sync + 'static,
    U: Fn(PrimitiveValue) -> F + Send + Sync + 'static,
    F: Future<Output = HydrationResult> + Send + 'static,
{
    Arc::new(DeferredSerializer {
        serialize,
        unserialize,
    })
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust also accepts "inf" and "nan" spellings; the wire format does not
        other if other.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => {
            return None
        }
        other => other.parse::<f64>().ok()?,
    };
    if parsed.is_nan() {
        None
    } else {
        Some(parsed)
    }
}

fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(millis) = parse_number(trimmed) {
        if !millis.is_finite() {
            return None;
        }
        return Utc.timestamp_millis_opt(millis as i64).single();
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(unserialized: Unserialized) -> Option<FieldValue> {
        match unserialized {
            Unserialized::Ready(value) => value,
            Unserialized::Deferred(_) => panic!("expected a synchronous value"),
        }
    }

    #[test]
    fn number_rejects_garbage() {
        let serializer = NumberSerializer;
        assert_eq!(
            ready(serializer.unserialize(&"42".into())),
            Some(FieldValue::Number(42.0))
        );
        assert_eq!(ready(serializer.unserialize(&"abc".into())), None);
        assert_eq!(ready(serializer.unserialize(&"".into())), None);
        assert_eq!(ready(serializer.unserialize(&"NaN".into())), None);
    }

    #[test]
    fn number_rejects_radix_literals() {
        let serializer = NumberSerializer;
        for raw in ["0x10", "0o7", "0b1"] {
            assert_eq!(ready(serializer.unserialize(&raw.into())), None, "{raw}");
        }
        assert_eq!(
            ready(serializer.unserialize(&"1e3".into())),
            Some(FieldValue::Number(1000.0))
        );
    }

    #[test]
    fn number_formats_integers_without_fraction() {
        assert_eq!(
            NumberSerializer.serialize(&FieldValue::Number(3.0)),
            Some(PrimitiveValue::from("3"))
        );
        assert_eq!(
            NumberSerializer.serialize(&FieldValue::Number(2.5)),
            Some(PrimitiveValue::from("2.5"))
        );
    }

    #[test]
    fn boolean_is_total() {
        let serializer = BooleanSerializer;
        assert_eq!(
            ready(serializer.unserialize(&"true".into())),
            Some(FieldValue::Boolean(true))
        );
        assert_eq!(
            ready(serializer.unserialize(&"yes".into())),
            Some(FieldValue::Boolean(false))
        );
        assert_eq!(
            ready(serializer.unserialize(&"".into())),
            Some(FieldValue::Boolean(false))
        );
    }

    #[test]
    fn date_accepts_epoch_millis() {
        let value = ready(DateSerializer.unserialize(&"86400000".into())).unwrap();
        assert_eq!(
            value.as_date().unwrap(),
            Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn date_accepts_iso_strings() {
        let value = ready(DateSerializer.unserialize(&"2024-03-01T10:30:00.000Z".into())).unwrap();
        assert_eq!(
            value.as_date().unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()
        );
        let value = ready(DateSerializer.unserialize(&"2024-03-01".into())).unwrap();
        assert_eq!(
            value.as_date().unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(ready(DateSerializer.unserialize(&"not a date".into())), None);
    }

    #[test]
    fn date_serializes_iso_8601() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(
            DateSerializer.serialize(&FieldValue::Date(date)),
            Some(PrimitiveValue::from("2024-03-01T10:30:00.000Z"))
        );
    }

    #[test]
    fn array_drops_malformed_elements() {
        let serializer = ArraySerializer::new(NumberSerializer);
        let value = ready(serializer.unserialize(&vec!["1", "x", "3"].into())).unwrap();
        assert_eq!(value, FieldValue::array([1.0, 3.0]));
    }

    #[test]
    fn array_accepts_single_primitive() {
        let serializer = ArraySerializer::new(StringSerializer);
        let value = ready(serializer.unserialize(&"a".into())).unwrap();
        assert_eq!(value, FieldValue::array(["a"]));
    }

    #[test]
    fn serialize_null_has_no_primitive() {
        assert_eq!(StringSerializer.serialize(&FieldValue::Null), None);
        assert_eq!(
            ArraySerializer::new(StringSerializer).serialize(&FieldValue::Null),
            None
        );
    }

    #[test]
    fn resolve_rejects_object_types() {
        assert!(resolve(FieldType::StringArray).is_ok());
        let err = match resolve(FieldType::Object) {
            Err(err) => err,
            Ok(_) => panic!("object types have no built-in serializer"),
        };
        assert!(err.to_string().contains("\"object\""));
    }

    #[tokio::test]
    async fn deferred_serializer_returns_future() {
        let serializer = deferred(
            |value: &FieldValue| value.as_str().map(PrimitiveValue::from),
            |primitive: PrimitiveValue| async move {
                Ok(primitive.first().map(|id| FieldValue::from(format!("user:{id}"))))
            },
        );
        match serializer.unserialize(&"7".into()) {
            Unserialized::Deferred(future) => {
                assert_eq!(future.await.unwrap(), Some(FieldValue::from("user:7")));
            }
            Unserialized::Ready(_) => panic!("expected a deferred value"),
        }
    }
}
