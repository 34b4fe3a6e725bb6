//! Repository-native property values.
//!
//! These mirror what the repository hands back over the wire: every value
//! carries its own type tag, and a property is either single- or
//! multi-valued. Converting to and from application values is the job of
//! the codec in the `safetypin` crate.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;

/// Property type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Undefined,
    String,
    Binary,
    Long,
    Double,
    Date,
    Boolean,
    Name,
    Path,
    Reference,
    WeakReference,
    Uri,
    Decimal,
}

impl PropertyType {
    /// Type name as the repository spells it.
    pub fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::String => "String",
            Self::Binary => "Binary",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Date => "Date",
            Self::Boolean => "Boolean",
            Self::Name => "Name",
            Self::Path => "Path",
            Self::Reference => "Reference",
            Self::WeakReference => "WeakReference",
            Self::Uri => "URI",
            Self::Decimal => "Decimal",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed value as stored by the repository.
#[derive(Debug, Clone, PartialEq)]
pub enum JcrValue {
    String(String),
    Binary(Vec<u8>),
    Long(i64),
    Double(f64),
    /// Milliseconds since the Unix epoch (the repository's calendar form).
    Date(i64),
    Boolean(bool),
    Name(String),
    Path(String),
    Reference(String),
    WeakReference(String),
    Uri(String),
    /// Arbitrary-precision decimal in its lexical form.
    Decimal(String),
}

impl JcrValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::String(_) => PropertyType::String,
            Self::Binary(_) => PropertyType::Binary,
            Self::Long(_) => PropertyType::Long,
            Self::Double(_) => PropertyType::Double,
            Self::Date(_) => PropertyType::Date,
            Self::Boolean(_) => PropertyType::Boolean,
            Self::Name(_) => PropertyType::Name,
            Self::Path(_) => PropertyType::Path,
            Self::Reference(_) => PropertyType::Reference,
            Self::WeakReference(_) => PropertyType::WeakReference,
            Self::Uri(_) => PropertyType::Uri,
            Self::Decimal(_) => PropertyType::Decimal,
        }
    }

    /// String form used for query comparisons and snapshots.
    pub fn lexical(&self) -> String {
        match self {
            Self::String(s)
            | Self::Name(s)
            | Self::Path(s)
            | Self::Reference(s)
            | Self::WeakReference(s)
            | Self::Uri(s)
            | Self::Decimal(s) => s.clone(),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Long(n) => n.to_string(),
            Self::Double(d) => d.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Date(millis) => DateTime::from_timestamp_millis(*millis)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_else(|| millis.to_string()),
        }
    }

    /// Numeric view for ordered comparisons, if the value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Long(n) => Some(*n as f64),
            Self::Double(d) => Some(*d),
            Self::Date(millis) => Some(*millis as f64),
            Self::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// The stored content of a property: one value or an ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyData {
    Single(JcrValue),
    Multiple(Vec<JcrValue>),
}

impl PropertyData {
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// Declared type. An empty multi-value is typed as String.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Single(v) => v.property_type(),
            Self::Multiple(values) => values
                .first()
                .map(JcrValue::property_type)
                .unwrap_or(PropertyType::String),
        }
    }

    /// All contained values, regardless of cardinality.
    pub fn iter(&self) -> std::slice::Iter<'_, JcrValue> {
        match self {
            Self::Single(v) => std::slice::from_ref(v).iter(),
            Self::Multiple(values) => values.iter(),
        }
    }

    /// Whether a multi-value holds a single type throughout.
    pub fn is_homogeneous(&self) -> bool {
        match self {
            Self::Single(_) => true,
            Self::Multiple(values) => values
                .windows(2)
                .all(|w| w[0].property_type() == w[1].property_type()),
        }
    }
}

/// What the repository declares about a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyDefinition {
    /// Managed by the repository; not writable by clients.
    pub protected: bool,
    pub multiple: bool,
}

/// A property as read from a remote node.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteProperty {
    name: String,
    data: PropertyData,
    definition: PropertyDefinition,
}

impl RemoteProperty {
    pub fn new(name: impl Into<String>, data: PropertyData, protected: bool) -> Self {
        let definition = PropertyDefinition {
            protected,
            multiple: data.is_multiple(),
        };
        Self {
            name: name.into(),
            data,
            definition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> PropertyDefinition {
        self.definition
    }

    pub fn property_type(&self) -> PropertyType {
        self.data.property_type()
    }

    pub fn data(&self) -> &PropertyData {
        &self.data
    }

    /// The single value. Fails with a format error on a multi-valued property.
    pub fn value(&self) -> Result<&JcrValue, RepositoryError> {
        match &self.data {
            PropertyData::Single(v) => Ok(v),
            PropertyData::Multiple(_) => Err(RepositoryError::ValueFormat(format!(
                "property {} is multi-valued",
                self.name
            ))),
        }
    }

    /// The value sequence. Fails with a format error on a single-valued property.
    pub fn values(&self) -> Result<&[JcrValue], RepositoryError> {
        match &self.data {
            PropertyData::Multiple(values) => Ok(values),
            PropertyData::Single(_) => Err(RepositoryError::ValueFormat(format!(
                "property {} is not multi-valued",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_names() {
        assert_eq!(PropertyType::Uri.to_string(), "URI");
        assert_eq!(PropertyType::WeakReference.to_string(), "WeakReference");
    }

    #[test]
    fn test_single_and_multi_access_fail_with_value_format() {
        let single = RemoteProperty::new("title", PropertyData::Single(JcrValue::Long(1)), false);
        assert!(single.value().is_ok());
        assert!(matches!(single.values(), Err(RepositoryError::ValueFormat(_))));

        let multi = RemoteProperty::new("tags", PropertyData::Multiple(vec![]), false);
        assert!(multi.values().is_ok());
        assert!(matches!(multi.value(), Err(RepositoryError::ValueFormat(_))));
        assert_eq!(multi.property_type(), PropertyType::String);
    }

    #[test]
    fn test_homogeneity() {
        let mixed = PropertyData::Multiple(vec![
            JcrValue::String("a".into()),
            JcrValue::Long(1),
        ]);
        assert!(!mixed.is_homogeneous());
        let same = PropertyData::Multiple(vec![JcrValue::Long(2), JcrValue::Long(1)]);
        assert!(same.is_homogeneous());
    }

    #[test]
    fn test_date_lexical_is_rfc3339() {
        assert_eq!(JcrValue::Date(0).lexical(), "1970-01-01T00:00:00.000Z");
    }
}
