//! Conversion between repository-native values and host [`Value`]s.

use chrono::DateTime;

use safetypin_jcr::{JcrValue, PropertyData, PropertyType, RemoteProperty, RepositoryError};

use crate::error::{Error, Result};
use crate::value::{Decimal, Value};

/// Whether a property is multi-valued.
///
/// Asks for the value sequence and treats a format error as "single-valued".
/// This is how the repository answers the question, so it is the answer we
/// trust over the declared definition.
pub fn is_multi_valued(property: &RemoteProperty) -> bool {
    !matches!(property.values(), Err(RepositoryError::ValueFormat(_)))
}

/// Decode a whole property, single- or multi-valued.
pub fn decode(property: &RemoteProperty) -> Result<Value> {
    if is_multi_valued(property) {
        property
            .values()?
            .iter()
            .map(decode_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::Multiple)
    } else {
        decode_value(property.value()?)
    }
}

/// Decode one value by its type tag. Dates are truncated to whole seconds.
pub fn decode_value(value: &JcrValue) -> Result<Value> {
    match value {
        JcrValue::String(s) | JcrValue::Name(s) | JcrValue::Path(s) => Ok(Value::String(s.clone())),
        JcrValue::Boolean(b) => Ok(Value::Boolean(*b)),
        JcrValue::Double(d) => Ok(Value::Double(*d)),
        JcrValue::Long(n) => Ok(Value::Long(*n)),
        JcrValue::Date(millis) => DateTime::from_timestamp(millis.div_euclid(1000), 0)
            .map(Value::Date)
            .ok_or_else(|| Error::PropertyType(format!("Date out of range: {millis}"))),
        JcrValue::Binary(bytes) => Ok(Value::Binary(bytes.clone())),
        JcrValue::Decimal(s) => Ok(Value::Decimal(s.parse::<Decimal>()?)),
        other => Err(unknown_type(other.property_type())),
    }
}

fn unknown_type(property_type: PropertyType) -> Error {
    Error::PropertyType(format!("Unknown property type: {property_type}"))
}

/// Encode a host value for writing.
///
/// Sequences become multi-values and must hold a single scalar type; mixed
/// and nested sequences are rejected. An empty sequence is an empty String
/// multi-value.
pub fn encode(value: &Value) -> Result<PropertyData> {
    match value {
        Value::Multiple(items) => {
            let encoded = items
                .iter()
                .map(|item| match item {
                    Value::Multiple(_) => Err(Error::PropertyType(
                        "nested sequences cannot be stored".to_string(),
                    )),
                    scalar => Ok(encode_scalar(scalar)),
                })
                .collect::<Result<Vec<_>>>()?;
            if let Some(first) = encoded.first() {
                let expected = first.property_type();
                if let Some(odd) = encoded.iter().find(|v| v.property_type() != expected) {
                    return Err(Error::PropertyType(format!(
                        "mixed value types in sequence: {expected} and {}",
                        odd.property_type()
                    )));
                }
            }
            Ok(PropertyData::Multiple(encoded))
        }
        scalar => Ok(PropertyData::Single(encode_scalar(scalar))),
    }
}

fn encode_scalar(value: &Value) -> JcrValue {
    match value {
        Value::String(s) => JcrValue::String(s.clone()),
        Value::Boolean(b) => JcrValue::Boolean(*b),
        Value::Double(d) => JcrValue::Double(*d),
        Value::Long(n) => JcrValue::Long(*n),
        Value::Date(dt) => JcrValue::Date(dt.timestamp_millis()),
        Value::Binary(bytes) => JcrValue::Binary(bytes.clone()),
        Value::Decimal(d) => JcrValue::Decimal(d.to_string()),
        // Only reached for nested sequences, which `encode` rejects first.
        Value::Multiple(_) => JcrValue::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn round_trip(value: Value) -> Value {
        let data = encode(&value).unwrap();
        decode(&RemoteProperty::new("p", data, false)).unwrap()
    }

    #[test]
    fn test_scalar_round_trips() {
        for value in [
            Value::from("text"),
            Value::from(true),
            Value::from(2.5),
            Value::from(42),
            Value::from(vec!["a", "b"]),
            Value::Multiple(vec![]),
        ] {
            assert_eq!(round_trip(value.clone()), value);
        }
    }

    #[test]
    fn test_dates_round_trip_to_whole_seconds() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 15).unwrap();
        assert_eq!(round_trip(Value::from(instant)), Value::from(instant));

        let with_millis = instant + chrono::Duration::milliseconds(750);
        assert_eq!(round_trip(Value::from(with_millis)), Value::from(instant));
    }

    #[test]
    fn test_pre_epoch_dates_truncate_downward() {
        let decoded = decode_value(&JcrValue::Date(-1500)).unwrap();
        assert_eq!(decoded, Value::Date(DateTime::from_timestamp(-2, 0).unwrap()));
    }

    #[test]
    fn test_names_and_paths_decode_as_strings() {
        assert_eq!(
            decode_value(&JcrValue::Name("cq:Page".into())).unwrap(),
            Value::from("cq:Page")
        );
        assert_eq!(
            decode_value(&JcrValue::Path("/content".into())).unwrap(),
            Value::from("/content")
        );
    }

    #[test]
    fn test_unknown_types_fail() {
        let err = decode_value(&JcrValue::Reference("abc".into())).unwrap_err();
        assert_eq!(err.to_string(), "Unknown property type: Reference");
        assert!(matches!(
            decode_value(&JcrValue::Uri("http://x".into())),
            Err(Error::PropertyType(_))
        ));
    }

    #[test]
    fn test_mixed_and_nested_sequences_are_rejected() {
        let mixed = Value::Multiple(vec![Value::from("a"), Value::from(1)]);
        assert!(matches!(encode(&mixed), Err(Error::PropertyType(_))));

        let nested = Value::Multiple(vec![Value::from(vec!["a"])]);
        assert!(matches!(encode(&nested), Err(Error::PropertyType(_))));
    }

    #[test]
    fn test_multi_valued_probe() {
        let single = RemoteProperty::new("a", PropertyData::Single(JcrValue::Long(1)), false);
        let multi = RemoteProperty::new("b", PropertyData::Multiple(vec![]), false);
        assert!(!is_multi_valued(&single));
        assert!(is_multi_valued(&multi));
    }
}
