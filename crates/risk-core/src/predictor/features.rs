//! Feature encoding for ML inference
//!
//! Maps a validated booking into the ordered numeric layout the trained
//! artifact expects. The layout comes from the artifact's manifest and is
//! checked against the booking schema when the encoder is built, so any
//! disagreement surfaces as a configuration error at load time.

use super::manifest::{Encoding, FeatureSpec};
use crate::error::ConfigurationError;
use crate::models::{BookingRecord, FeatureVector, FieldValue, LeadTimeCategory};
use crate::schema::{BookingField, FieldSpec, ValidatedRecord};
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum ColumnEncoding {
    Numeric { mean: f64, std: f64 },
    OneHot(Vec<&'static str>),
    Ordinal(Vec<&'static str>),
}

#[derive(Debug, Clone)]
struct Column {
    field: BookingField,
    encoding: ColumnEncoding,
}

/// Encodes validated bookings into model input vectors
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    columns: Vec<Column>,
    names: Vec<String>,
}

impl FeatureEncoder {
    /// Build an encoder from manifest feature specs, checking them against the schema
    pub fn from_manifest(features: &[FeatureSpec]) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(features.len());
        let mut names = Vec::new();

        for feature in features {
            let field = BookingField::from_name(&feature.field)
                .ok_or_else(|| ConfigurationError::UnknownField(feature.field.clone()))?;
            if !seen.insert(field) {
                return Err(ConfigurationError::DuplicateField(feature.field.clone()));
            }

            let encoding = column_encoding(field, &feature.encoding)?;
            match &encoding {
                ColumnEncoding::OneHot(categories) => {
                    names.extend(categories.iter().map(|c| format!("{}={}", field.name(), c)));
                }
                _ => names.push(field.name().to_string()),
            }
            columns.push(Column { field, encoding });
        }

        if let Some(missing) = BookingField::ALL.iter().find(|f| !seen.contains(*f)) {
            return Err(ConfigurationError::MissingField(missing.name().to_string()));
        }

        Ok(Self { columns, names })
    }

    /// Number of values in every encoded vector
    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Column names in model input order, one-hot columns as `field=category`
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    pub fn encode(&self, record: &ValidatedRecord) -> FeatureVector {
        let record = record.record();
        let mut values = Vec::with_capacity(self.width());

        for column in &self.columns {
            let value = resolve(record, column.field);
            // Value kinds are matched to encodings in from_manifest.
            match &column.encoding {
                ColumnEncoding::Numeric { mean, std } => {
                    let x = value.as_number().unwrap_or_default();
                    values.push(((x - mean) / std) as f32);
                }
                ColumnEncoding::OneHot(categories) => {
                    let label = value.as_category();
                    values.extend(
                        categories
                            .iter()
                            .map(|c| if Some(*c) == label { 1.0 } else { 0.0 }),
                    );
                }
                ColumnEncoding::Ordinal(categories) => {
                    let label = value.as_category();
                    let code = categories
                        .iter()
                        .position(|c| Some(*c) == label)
                        .unwrap_or_default();
                    values.push(code as f32);
                }
            }
        }

        FeatureVector::from_values(values)
    }
}

/// Value of a field, deriving the derivable ones when the record omits them
fn resolve(record: &BookingRecord, field: BookingField) -> FieldValue {
    if let Some(value) = record.value(field) {
        return value;
    }
    match field {
        BookingField::RoomAssignedDifferent => {
            FieldValue::Flag(record.reserved_room_type != record.assigned_room_type)
        }
        // Only derivable fields are ever absent.
        _ => FieldValue::Category(LeadTimeCategory::from_lead_time(record.lead_time).as_str()),
    }
}

fn column_encoding(
    field: BookingField,
    encoding: &Encoding,
) -> Result<ColumnEncoding, ConfigurationError> {
    let kind_error = || ConfigurationError::EncodingKind {
        field: field.name().to_string(),
        encoding: encoding.name(),
    };

    match (field.spec(), encoding) {
        (FieldSpec::Categorical(domain), Encoding::OneHot { categories }) => {
            Ok(ColumnEncoding::OneHot(match_domain(field, domain, categories)?))
        }
        (FieldSpec::Categorical(domain), Encoding::Ordinal { categories }) => {
            Ok(ColumnEncoding::Ordinal(match_domain(field, domain, categories)?))
        }
        (FieldSpec::Categorical(_), Encoding::Numeric { .. }) => Err(kind_error()),
        (_, Encoding::Numeric { scale }) => {
            let (mean, std) = scale.map(|s| (s.mean, s.std)).unwrap_or((0.0, 1.0));
            if !(std.is_finite() && std > 0.0 && mean.is_finite()) {
                return Err(ConfigurationError::InvalidScale {
                    field: field.name().to_string(),
                });
            }
            Ok(ColumnEncoding::Numeric { mean, std })
        }
        (_, Encoding::OneHot { .. } | Encoding::Ordinal { .. }) => Err(kind_error()),
    }
}

/// Map manifest categories onto the field domain; both must hold the same set
fn match_domain(
    field: BookingField,
    domain: &'static [&'static str],
    categories: &[String],
) -> Result<Vec<&'static str>, ConfigurationError> {
    let mismatch = |detail: String| ConfigurationError::CategoryMismatch {
        field: field.name().to_string(),
        detail,
    };

    let mut mapped = Vec::with_capacity(categories.len());
    for category in categories {
        let known = domain
            .iter()
            .copied()
            .find(|d| *d == category.as_str())
            .ok_or_else(|| mismatch(format!("unknown category '{}'", category)))?;
        if mapped.contains(&known) {
            return Err(mismatch(format!("category '{}' listed twice", category)));
        }
        mapped.push(known);
    }

    if let Some(absent) = domain.iter().find(|d| !mapped.contains(*d)) {
        return Err(mismatch(format!("category '{}' is not encoded", absent)));
    }
    Ok(mapped)
}
