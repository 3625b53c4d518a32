//! Round-trip properties of the built-in serializers.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use searchform_fields::serializer::resolve;
use searchform_fields::{FieldType, FieldValue, PrimitiveValue, Unserialized};

fn round_trip(field_type: FieldType, value: &FieldValue) -> Option<FieldValue> {
    let serializer = resolve(field_type).unwrap();
    let primitive = serializer.serialize(value)?;
    match serializer.unserialize(&primitive) {
        Unserialized::Ready(value) => value,
        Unserialized::Deferred(_) => panic!("built-in serializers are synchronous"),
    }
}

proptest! {
    #[test]
    fn strings_round_trip(text in ".*") {
        let value = FieldValue::from(text);
        prop_assert_eq!(round_trip(FieldType::String, &value), Some(value));
    }

    #[test]
    fn finite_numbers_round_trip(number in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
        let value = FieldValue::from(number);
        prop_assert_eq!(round_trip(FieldType::Number, &value), Some(value));
    }

    #[test]
    fn integers_serialize_without_fraction(number in -1_000_000i64..1_000_000) {
        let serializer = resolve(FieldType::Number).unwrap();
        prop_assert_eq!(
            serializer.serialize(&FieldValue::from(number)),
            Some(PrimitiveValue::from(number.to_string()))
        );
    }

    #[test]
    fn booleans_round_trip(flag in any::<bool>()) {
        let value = FieldValue::from(flag);
        prop_assert_eq!(round_trip(FieldType::Boolean, &value), Some(value));
    }

    #[test]
    fn dates_round_trip_at_millisecond_precision(millis in 0i64..4_102_444_800_000) {
        let date = Utc.timestamp_millis_opt(millis).unwrap();
        let value = FieldValue::from(date);
        prop_assert_eq!(round_trip(FieldType::Date, &value), Some(value));
    }

    #[test]
    fn string_arrays_round_trip(items in proptest::collection::vec("[a-z0-9 ]{0,8}", 0..6)) {
        let value = FieldValue::array(items.clone());
        let back = round_trip(FieldType::StringArray, &value).unwrap();
        let back: Vec<String> = back
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item.as_str().unwrap().to_string())
            .collect();
        prop_assert_eq!(back, items);
    }

    #[test]
    fn garbage_numbers_fall_back(raw in "[a-df-zA-DF-Z]{1,6}") {
        let serializer = resolve(FieldType::Number).unwrap();
        let unserialized = serializer.unserialize(&PrimitiveValue::from(raw));
        prop_assert!(matches!(unserialized, Unserialized::Ready(None)));
    }
}
