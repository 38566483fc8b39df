//! Reshapes parsed records into the canonical storage shape.
//!
//! Every record gets a sequential id, a display name, a primary metric (the
//! `age` field), an address, and an `additional_info` bucket with whatever is
//! left. Numeric leftovers are also promoted to top-level fields so they can be
//! charted without digging into the bucket.

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    error::ValidationError,
    value::{Record, Value},
};

pub const ID_FIELD: &str = "id";
pub const NAME_FIELD: &str = "name";
pub const AGE_FIELD: &str = "age";
pub const ADDRESS_FIELD: &str = "address";
pub const EXTRA_FIELD: &str = "additional_info";

const RESERVED_FIELDS: &[&str] = &[ID_FIELD, NAME_FIELD, AGE_FIELD, ADDRESS_FIELD, EXTRA_FIELD];

/// Validation policy applied while transforming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum TransformMode {
    /// Missing names fall back to a placeholder and missing ages to zero.
    #[default]
    Lenient,
    /// Requires `name.firstName`, `name.lastName`, and a non-zero numeric `age`.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRecord {
    /// 1-based position in the source file.
    pub id: usize,
    pub display_name: String,
    pub primary_metric: f64,
    /// Empty mapping when the source had no address.
    pub address: Value,
    /// Numeric leftovers, also present in `extra`.
    pub promoted: Record,
    pub extra: Record,
}

impl TransformedRecord {
    pub fn has_address(&self) -> bool {
        !self.address.is_empty_like()
    }

    /// Numeric value of a report column on this record.
    ///
    /// `age` maps to the primary metric, `address` and `address.*` paths to
    /// the address; other names are looked up among the promoted fields and
    /// then as dotted paths into `additional_info`.
    pub fn metric(&self, column: &str) -> Option<f64> {
        if column == AGE_FIELD {
            return Some(self.primary_metric).filter(|n| n.is_finite());
        }
        if column == ADDRESS_FIELD {
            return self.address.as_number();
        }
        if let Some(rest) = column.strip_prefix("address.")
            && let Some(address) = self.address.as_mapping()
        {
            return address.get_path(rest).and_then(Value::as_number);
        }
        self.promoted
            .get(column)
            .and_then(Value::as_number)
            .or_else(|| self.extra.get_path(column).and_then(Value::as_number))
    }

    /// The record as an ordered JSON-ready mapping, optionally without `age`.
    pub fn shape(&self, include_age: bool) -> Record {
        let mut shape = Record::new();
        shape.insert(ID_FIELD, Value::Number(self.id as f64));
        shape.insert(NAME_FIELD, Value::String(self.display_name.clone()));
        if include_age {
            shape.insert(AGE_FIELD, Value::Number(self.primary_metric));
        }
        shape.insert(ADDRESS_FIELD, self.address.clone());
        for (key, value) in self.promoted.iter() {
            shape.insert(key.clone(), value.clone());
        }
        shape.insert(EXTRA_FIELD, Value::Mapping(self.extra.clone()));
        shape
    }
}

impl Serialize for TransformedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.shape(true).serialize(serializer)
    }
}

/// Where a display name may come from, in priority order.
#[derive(Debug, Clone, Copy)]
enum NameSource {
    Path(&'static str),
    FirstLast,
}

const DISPLAY_NAME_RULES: &[NameSource] = &[
    NameSource::Path("name.full"),
    NameSource::Path("name"),
    NameSource::Path("full_name"),
    NameSource::Path("fullName"),
    NameSource::FirstLast,
];

const FIRST_NAME_PATH: &str = "name.firstName";
const LAST_NAME_PATH: &str = "name.lastName";

impl NameSource {
    /// Removes and returns the name when this source holds a non-empty string.
    fn take(self, record: &mut Record) -> Option<String> {
        match self {
            NameSource::Path(path) => take_string(record, path),
            NameSource::FirstLast => {
                let first = non_empty_str(record, FIRST_NAME_PATH)?;
                let last = non_empty_str(record, LAST_NAME_PATH)?;
                let joined = format!("{first} {last}");
                record.remove_path(FIRST_NAME_PATH);
                record.remove_path(LAST_NAME_PATH);
                Some(joined)
            }
        }
    }
}

fn non_empty_str<'a>(record: &'a Record, path: &str) -> Option<&'a str> {
    record
        .get_path(path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn take_string(record: &mut Record, path: &str) -> Option<String> {
    let value = non_empty_str(record, path)?.to_string();
    record.remove_path(path);
    Some(value)
}

pub fn transform(
    records: &[Record],
    mode: TransformMode,
) -> Result<Vec<TransformedRecord>, ValidationError> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| transform_record(record.clone(), idx + 1, mode))
        .collect()
}

fn transform_record(
    mut working: Record,
    id: usize,
    mode: TransformMode,
) -> Result<TransformedRecord, ValidationError> {
    let (display_name, primary_metric) = match mode {
        TransformMode::Lenient => {
            let name = DISPLAY_NAME_RULES
                .iter()
                .find_map(|rule| rule.take(&mut working))
                .unwrap_or_else(|| format!("Record {id}"));
            let age = take_numeric_age(&mut working).unwrap_or(0.0);
            (name, age)
        }
        TransformMode::Strict => {
            let first = non_empty_str(&working, FIRST_NAME_PATH).map(str::to_string);
            let last = non_empty_str(&working, LAST_NAME_PATH).map(str::to_string);
            let (Some(first), Some(last)) = (first, last) else {
                return Err(ValidationError::MissingName { id });
            };
            let name = format!("{first} {last}");
            working.remove(NAME_FIELD);
            let age = match take_numeric_age(&mut working) {
                Some(age) if age != 0.0 => age,
                _ => return Err(ValidationError::InvalidAge { id, name }),
            };
            (name, age)
        }
    };

    let address = working.remove(ADDRESS_FIELD).unwrap_or_default();

    let promoted: Record = working
        .iter()
        .filter(|(key, value)| value.is_number() && !RESERVED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    debug!(
        "Record {id}: name '{display_name}', {} promoted, {} extra field(s)",
        promoted.len(),
        working.len()
    );

    Ok(TransformedRecord {
        id,
        display_name,
        primary_metric,
        address,
        promoted,
        extra: working,
    })
}

fn take_numeric_age(record: &mut Record) -> Option<f64> {
    let age = record.get(AGE_FIELD).and_then(Value::as_number)?;
    record.remove(AGE_FIELD);
    Some(age)
}
