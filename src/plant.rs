//! Plant specimen records and their external-representation mapping.
//!
//! A [`PlantRecord`] round-trips between three shapes: the raw column-name →
//! string mapping coming from CSV rows and web forms, the typed struct stored
//! in SQLite, and the external camelCase JSON representation served by the
//! API. Field coercion lives in [`crate::normalize`]; this module decides
//! which coercion applies to which field.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::HashMap;

use crate::normalize::{camel_to_snake, clean_text, parse_float};

/// External keys whose canonical attribute name is not a pure mechanical
/// case conversion and must be pinned explicitly.
const FIELD_OVERRIDES: &[(&str, &str)] = &[("identificationID", "identification_id")];

fn canonical_field(key: &str) -> String {
    for (external, canonical) in FIELD_OVERRIDES {
        if *external == key {
            return (*canonical).to_string();
        }
    }
    camel_to_snake(key)
}

/// A plant specimen record.
///
/// Every attribute is optional; absence is represented as `None`, never as a
/// placeholder string. Latitude, longitude, and elevation are finite numbers
/// or absent. `event_date` is deliberately free text — the upstream herbarium
/// labels carry ranges and approximations that must survive verbatim.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlantRecord {
    pub id: i64,
    pub classification: Option<String>,
    pub kingdom: Option<String>,
    pub chinese_kingdom_name: Option<String>,
    pub family: Option<String>,
    pub chinese_family_name: Option<String>,
    pub genus: Option<String>,
    pub chinese_genus_name: Option<String>,
    pub scientific_name: Option<String>,
    pub vernacular_name: Option<String>,
    #[serde(rename = "identificationID")]
    pub identification_id: Option<String>,
    pub recorded_by: Option<String>,
    pub record_number: Option<String>,
    pub event_date: Option<String>,
    pub identified_by: Option<String>,
    pub country: Option<String>,
    pub state_province: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub locality: Option<String>,
    pub decimal_latitude: Option<f64>,
    pub decimal_longitude: Option<f64>,
    pub minimum_elevation_in_meters: Option<f64>,
    pub habitat: Option<String>,
    pub habit: Option<String>,
    // The plant API has historically exposed its timestamps in snake_case.
    #[serde(rename = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updated_at")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlantRecord {
    /// Applies one external key/value pair to the record.
    ///
    /// The key is resolved to its canonical attribute name and dispatched
    /// through an explicit field table: numeric fields go through
    /// [`parse_float`], everything else is trim-and-copy with the empty
    /// string coalesced to `None`. Unknown keys are skipped.
    pub fn apply_external(&mut self, key: &str, value: &str) {
        match canonical_field(key).as_str() {
            "classification" => self.classification = clean_text(value),
            "kingdom" => self.kingdom = clean_text(value),
            "chinese_kingdom_name" => self.chinese_kingdom_name = clean_text(value),
            "family" => self.family = clean_text(value),
            "chinese_family_name" => self.chinese_family_name = clean_text(value),
            "genus" => self.genus = clean_text(value),
            "chinese_genus_name" => self.chinese_genus_name = clean_text(value),
            "scientific_name" => self.scientific_name = clean_text(value),
            "vernacular_name" => self.vernacular_name = clean_text(value),
            "identification_id" => self.identification_id = clean_text(value),
            "recorded_by" => self.recorded_by = clean_text(value),
            "record_number" => self.record_number = clean_text(value),
            "event_date" => self.event_date = clean_text(value),
            "identified_by" => self.identified_by = clean_text(value),
            "country" => self.country = clean_text(value),
            "state_province" => self.state_province = clean_text(value),
            "city" => self.city = clean_text(value),
            "county" => self.county = clean_text(value),
            "locality" => self.locality = clean_text(value),
            "decimal_latitude" => self.decimal_latitude = parse_float(value),
            "decimal_longitude" => self.decimal_longitude = parse_float(value),
            "minimum_elevation_in_meters" => {
                self.minimum_elevation_in_meters = parse_float(value)
            }
            "habitat" => self.habitat = clean_text(value),
            "habit" => self.habit = clean_text(value),
            _ => {}
        }
    }

    /// Builds a record from a raw external mapping (CSV row or form body).
    pub fn from_external(raw: &HashMap<String, String>) -> Self {
        let mut record = Self::default();
        for (key, value) in raw {
            record.apply_external(key, value);
        }
        record
    }

    /// The external camelCase representation served by the JSON API.
    pub fn to_external(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
