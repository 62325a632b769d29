//! Insect specimen records and their external-representation mapping.
//!
//! The insect feed carries a much wider attribute set than the plant one:
//! sequencing status, preservation and institutional metadata, contact and
//! project details, and gene annotations. Conceptual dates (collection,
//! identification, report, sequencing) are normalized to calendar dates on
//! the way in; the multi-image cell is collapsed to a single pipe-joined
//! string.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::HashMap;

use crate::normalize::{camel_to_snake, clean_text, normalize_image_refs, parse_date, parse_float};

/// An insect specimen record. All attributes optional, like [`crate::plant::PlantRecord`].
#[derive(Debug, Clone, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InsectRecord {
    pub id: i64,

    // Basic identifiers
    pub serial_number: Option<String>,
    pub leiqun: Option<String>,
    pub sequencing_status: Option<String>,
    pub original_id: Option<String>,
    pub chinese_name: Option<String>,

    // Taxonomic lineage
    pub phylum: Option<String>,
    pub phylum_name: Option<String>,
    pub class: Option<String>,
    pub class_name: Option<String>,
    pub order: Option<String>,
    pub order_name: Option<String>,
    pub chinese_family_name: Option<String>,
    pub family_name: Option<String>,
    pub genus_name: Option<String>,
    pub species_name: Option<String>,
    pub infraspecies_name: Option<String>,

    // Citations
    pub citation1: Option<String>,
    pub citation2: Option<String>,

    // Geography and collection context
    pub resource_code: Option<String>,
    pub country: Option<String>,
    pub province: Option<String>,
    pub province_code: Option<String>,
    pub county: Option<String>,
    pub locality: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub altitude: Option<f64>,
    pub description: Option<String>,
    pub habitat: Option<String>,
    pub host: Option<String>,
    pub image_url: Option<String>,
    pub record_address: Option<String>,

    // Preservation and institutional metadata
    pub preservation_institution: Option<String>,
    pub institution_code: Option<String>,
    pub collector: Option<String>,
    pub collection_date: Option<NaiveDate>,
    pub collection_number: Option<String>,
    pub specimen_number: Option<String>,
    pub identifier: Option<String>,
    pub identification_date: Option<NaiveDate>,
    pub specimen_attribute: Option<String>,
    pub preservation_method: Option<String>,
    pub physical_state: Option<String>,
    pub sharing_method: Option<String>,
    pub access_method: Option<String>,

    // Literature and contact metadata
    pub literature: Option<String>,
    pub contact_person: Option<String>,
    pub institution_address: Option<String>,
    pub postcode: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    // Project metadata
    pub project_name: Option<String>,
    pub project_code: Option<String>,
    pub report_date: Option<NaiveDate>,
    pub sampling_point: Option<String>,

    // Gene metadata
    pub gene_code: Option<String>,
    pub gene_name: Option<String>,
    pub gene_description: Option<String>,
    pub gene_alias: Option<String>,

    // Sequencing metadata
    pub sequencing_date: Option<NaiveDate>,
    pub sequencer: Option<String>,
    pub project_task_code: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl InsectRecord {
    /// Applies one external key/value pair to the record. Date fields go
    /// through [`parse_date`], coordinates and altitude through
    /// [`parse_float`], the image cell through [`normalize_image_refs`],
    /// everything else is trim-and-copy. Unknown keys are skipped.
    pub fn apply_external(&mut self, key: &str, value: &str) {
        match camel_to_snake(key).as_str() {
            "serial_number" => self.serial_number = clean_text(value),
            "leiqun" => self.leiqun = clean_text(value),
            "sequencing_status" => self.sequencing_status = clean_text(value),
            "original_id" => self.original_id = clean_text(value),
            "chinese_name" => self.chinese_name = clean_text(value),

            "phylum" => self.phylum = clean_text(value),
            "phylum_name" => self.phylum_name = clean_text(value),
            "class" => self.class = clean_text(value),
            "class_name" => self.class_name = clean_text(value),
            "order" => self.order = clean_text(value),
            "order_name" => self.order_name = clean_text(value),
            "chinese_family_name" => self.chinese_family_name = clean_text(value),
            "family_name" => self.family_name = clean_text(value),
            "genus_name" => self.genus_name = clean_text(value),
            "species_name" => self.species_name = clean_text(value),
            "infraspecies_name" => self.infraspecies_name = clean_text(value),

            "citation1" => self.citation1 = clean_text(value),
            "citation2" => self.citation2 = clean_text(value),

            "resource_code" => self.resource_code = clean_text(value),
            "country" => self.country = clean_text(value),
            "province" => self.province = clean_text(value),
            "province_code" => self.province_code = clean_text(value),
            "county" => self.county = clean_text(value),
            "locality" => self.locality = clean_text(value),
            "longitude" => self.longitude = parse_float(value),
            "latitude" => self.latitude = parse_float(value),
            "altitude" => self.altitude = parse_float(value),
            "description" => self.description = clean_text(value),
            "habitat" => self.habitat = clean_text(value),
            "host" => self.host = clean_text(value),
            "image_url" => self.image_url = normalize_image_refs(value),
            "record_address" => self.record_address = clean_text(value),

            "preservation_institution" => self.preservation_institution = clean_text(value),
            "institution_code" => self.institution_code = clean_text(value),
            "collector" => self.collector = clean_text(value),
            "collection_date" => self.collection_date = parse_date(value),
            "collection_number" => self.collection_number = clean_text(value),
            "specimen_number" => self.specimen_number = clean_text(value),
            "identifier" => self.identifier = clean_text(value),
            "identification_date" => self.identification_date = parse_date(value),
            "specimen_attribute" => self.specimen_attribute = clean_text(value),
            "preservation_method" => self.preservation_method = clean_text(value),
            "physical_state" => self.physical_state = clean_text(value),
            "sharing_method" => self.sharing_method = clean_text(value),
            "access_method" => self.access_method = clean_text(value),

            "literature" => self.literature = clean_text(value),
            "contact_person" => self.contact_person = clean_text(value),
            "institution_address" => self.institution_address = clean_text(value),
            "postcode" => self.postcode = clean_text(value),
            "phone" => self.phone = clean_text(value),
            "email" => self.email = clean_text(value),

            "project_name" => self.project_name = clean_text(value),
            "project_code" => self.project_code = clean_text(value),
            "report_date" => self.report_date = parse_date(value),
            "sampling_point" => self.sampling_point = clean_text(value),

            "gene_code" => self.gene_code = clean_text(value),
            "gene_name" => self.gene_name = clean_text(value),
            "gene_description" => self.gene_description = clean_text(value),
            "gene_alias" => self.gene_alias = clean_text(value),

            "sequencing_date" => self.sequencing_date = parse_date(value),
            "sequencer" => self.sequencer = clean_text(value),
            "project_task_code" => self.project_task_code = clean_text(value),

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
