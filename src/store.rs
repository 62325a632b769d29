//! Data access layer: all SQL for plant and insect records.
//!
//! Insert functions are generic over the executor so the bulk importer can
//! stage rows inside its batch transaction while the HTTP handlers write
//! straight through the pool.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::insect::InsectRecord;
use crate::plant::PlantRecord;

/// One page of list results plus pagination arithmetic.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Default, Clone)]
pub struct PlantFilter {
    pub q: Option<String>,
    pub family: Option<String>,
    pub country: Option<String>,
    pub habitat: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct InsectFilter {
    pub q: Option<String>,
    pub family: Option<String>,
    pub province: Option<String>,
    pub collection_date_start: Option<NaiveDate>,
    pub collection_date_end: Option<NaiveDate>,
}

// ============ Plants ============

pub async fn insert_plant<'e, E>(executor: E, record: &PlantRecord) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO plant_records (
            classification, kingdom, chinese_kingdom_name, family,
            chinese_family_name, genus, chinese_genus_name, scientific_name,
            vernacular_name, identification_id, recorded_by, record_number,
            event_date, identified_by, country, state_province, city, county,
            locality, decimal_latitude, decimal_longitude,
            minimum_elevation_in_meters, habitat, habit, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.classification)
    .bind(&record.kingdom)
    .bind(&record.chinese_kingdom_name)
    .bind(&record.family)
    .bind(&record.chinese_family_name)
    .bind(&record.genus)
    .bind(&record.chinese_genus_name)
    .bind(&record.scientific_name)
    .bind(&record.vernacular_name)
    .bind(&record.identification_id)
    .bind(&record.recorded_by)
    .bind(&record.record_number)
    .bind(&record.event_date)
    .bind(&record.identified_by)
    .bind(&record.country)
    .bind(&record.state_province)
    .bind(&record.city)
    .bind(&record.county)
    .bind(&record.locality)
    .bind(record.decimal_latitude)
    .bind(record.decimal_longitude)
    .bind(record.minimum_elevation_in_meters)
    .bind(&record.habitat)
    .bind(&record.habit)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_plant(pool: &SqlitePool, record: &PlantRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE plant_records SET
            classification = ?, kingdom = ?, chinese_kingdom_name = ?,
            family = ?, chinese_family_name = ?, genus = ?,
            chinese_genus_name = ?, scientific_name = ?, vernacular_name = ?,
            identification_id = ?, recorded_by = ?, record_number = ?,
            event_date = ?, identified_by = ?, country = ?, state_province = ?,
            city = ?, county = ?, locality = ?, decimal_latitude = ?,
            decimal_longitude = ?, minimum_elevation_in_meters = ?,
            habitat = ?, habit = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&record.classification)
    .bind(&record.kingdom)
    .bind(&record.chinese_kingdom_name)
    .bind(&record.family)
    .bind(&record.chinese_family_name)
    .bind(&record.genus)
    .bind(&record.chinese_genus_name)
    .bind(&record.scientific_name)
    .bind(&record.vernacular_name)
    .bind(&record.identification_id)
    .bind(&record.recorded_by)
    .bind(&record.record_number)
    .bind(&record.event_date)
    .bind(&record.identified_by)
    .bind(&record.country)
    .bind(&record.state_province)
    .bind(&record.city)
    .bind(&record.county)
    .bind(&record.locality)
    .bind(record.decimal_latitude)
    .bind(record.decimal_longitude)
    .bind(record.minimum_elevation_in_meters)
    .bind(&record.habitat)
    .bind(&record.habit)
    .bind(Utc::now())
    .bind(record.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_plant(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM plant_records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_plant(pool: &SqlitePool, id: i64) -> Result<Option<PlantRecord>> {
    let record = sqlx::query_as::<_, PlantRecord>("SELECT * FROM plant_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(record)
}

pub async fn count_plants(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plant_records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn list_all_plants(pool: &SqlitePool) -> Result<Vec<PlantRecord>> {
    let records = sqlx::query_as::<_, PlantRecord>("SELECT * FROM plant_records ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(records)
}

fn push_plant_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PlantFilter, wide_search: bool) {
    if let Some(q) = filter.q.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{q}%");
        qb.push(" AND (scientific_name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR vernacular_name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR family LIKE ");
        qb.push_bind(pattern.clone());
        if wide_search {
            qb.push(" OR genus LIKE ");
            qb.push_bind(pattern);
        }
        qb.push(")");
    }
    if let Some(family) = filter.family.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND family = ");
        qb.push_bind(family.to_string());
    }
    if let Some(country) = filter.country.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND country = ");
        qb.push_bind(country.to_string());
    }
    if let Some(habitat) = filter.habitat.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND habitat LIKE ");
        qb.push_bind(format!("%{habitat}%"));
    }
}

pub async fn list_plants(
    pool: &SqlitePool,
    filter: &PlantFilter,
    page: i64,
    per_page: i64,
) -> Result<Page<PlantRecord>> {
    let page = page.max(1);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM plant_records WHERE 1=1");
    push_plant_filters(&mut count_qb, filter, false);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM plant_records WHERE 1=1");
    push_plant_filters(&mut qb, filter, false);
    qb.push(" ORDER BY id LIMIT ");
    qb.push_bind(per_page);
    qb.push(" OFFSET ");
    qb.push_bind((page - 1) * per_page);
    let items = qb.build_query_as::<PlantRecord>().fetch_all(pool).await?;

    Ok(Page {
        items,
        page,
        per_page,
        total,
        total_pages: (total + per_page - 1) / per_page.max(1),
    })
}

/// Capped search used by the JSON API; the free-text query also covers genus.
pub async fn search_plants(
    pool: &SqlitePool,
    filter: &PlantFilter,
    limit: i64,
) -> Result<Vec<PlantRecord>> {
    let mut qb = QueryBuilder::new("SELECT * FROM plant_records WHERE 1=1");
    push_plant_filters(&mut qb, filter, true);
    qb.push(" ORDER BY id LIMIT ");
    qb.push_bind(limit);
    let records = qb.build_query_as::<PlantRecord>().fetch_all(pool).await?;
    Ok(records)
}

// ============ Insects ============

pub async fn insert_insect<'e, E>(executor: E, record: &InsectRecord) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO insect_records (
            serial_number, leiqun, sequencing_status, original_id,
            chinese_name, phylum, phylum_name, class, class_name, "order",
            order_name, chinese_family_name, family_name, genus_name,
            species_name, infraspecies_name, citation1, citation2,
            resource_code, country, province, province_code, county, locality,
            longitude, latitude, altitude, description, habitat, host,
            image_url, record_address, preservation_institution,
            institution_code, collector, collection_date, collection_number,
            specimen_number, identifier, identification_date,
            specimen_attribute, preservation_method, physical_state,
            sharing_method, access_method, literature, contact_person,
            institution_address, postcode, phone, email, project_name,
            project_code, report_date, sampling_point, gene_code, gene_name,
            gene_description, gene_alias, sequencing_date, sequencer,
            project_task_code, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?)
        "#,
    )
    .bind(&record.serial_number)
    .bind(&record.leiqun)
    .bind(&record.sequencing_status)
    .bind(&record.original_id)
    .bind(&record.chinese_name)
    .bind(&record.phylum)
    .bind(&record.phylum_name)
    .bind(&record.class)
    .bind(&record.class_name)
    .bind(&record.order)
    .bind(&record.order_name)
    .bind(&record.chinese_family_name)
    .bind(&record.family_name)
    .bind(&record.genus_name)
    .bind(&record.species_name)
    .bind(&record.infraspecies_name)
    .bind(&record.citation1)
    .bind(&record.citation2)
    .bind(&record.resource_code)
    .bind(&record.country)
    .bind(&record.province)
    .bind(&record.province_code)
    .bind(&record.county)
    .bind(&record.locality)
    .bind(record.longitude)
    .bind(record.latitude)
    .bind(record.altitude)
    .bind(&record.description)
    .bind(&record.habitat)
    .bind(&record.host)
    .bind(&record.image_url)
    .bind(&record.record_address)
    .bind(&record.preservation_institution)
    .bind(&record.institution_code)
    .bind(&record.collector)
    .bind(record.collection_date)
    .bind(&record.collection_number)
    .bind(&record.specimen_number)
    .bind(&record.identifier)
    .bind(record.identification_date)
    .bind(&record.specimen_attribute)
    .bind(&record.preservation_method)
    .bind(&record.physical_state)
    .bind(&record.sharing_method)
    .bind(&record.access_method)
    .bind(&record.literature)
    .bind(&record.contact_person)
    .bind(&record.institution_address)
    .bind(&record.postcode)
    .bind(&record.phone)
    .bind(&record.email)
    .bind(&record.project_name)
    .bind(&record.project_code)
    .bind(record.report_date)
    .bind(&record.sampling_point)
    .bind(&record.gene_code)
    .bind(&record.gene_name)
    .bind(&record.gene_description)
    .bind(&record.gene_alias)
    .bind(record.sequencing_date)
    .bind(&record.sequencer)
    .bind(&record.project_task_code)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_insect(pool: &SqlitePool, record: &InsectRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE insect_records SET
            serial_number = ?, leiqun = ?, sequencing_status = ?,
            original_id = ?, chinese_name = ?, phylum = ?, phylum_name = ?,
            class = ?, class_name = ?, "order" = ?, order_name = ?,
            chinese_family_name = ?, family_name = ?, genus_name = ?,
            species_name = ?, infraspecies_name = ?, citation1 = ?,
            citation2 = ?, resource_code = ?, country = ?, province = ?,
            province_code = ?, county = ?, locality = ?, longitude = ?,
            latitude = ?, altitude = ?, description = ?, habitat = ?,
            host = ?, image_url = ?, record_address = ?,
            preservation_institution = ?, institution_code = ?, collector = ?,
            collection_date = ?, collection_number = ?, specimen_number = ?,
            identifier = ?, identification_date = ?, specimen_attribute = ?,
            preservation_method = ?, physical_state = ?, sharing_method = ?,
            access_method = ?, literature = ?, contact_person = ?,
            institution_address = ?, postcode = ?, phone = ?, email = ?,
            project_name = ?, project_code = ?, report_date = ?,
            sampling_point = ?, gene_code = ?, gene_name = ?,
            gene_description = ?, gene_alias = ?, sequencing_date = ?,
            sequencer = ?, project_task_code = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&record.serial_number)
    .bind(&record.leiqun)
    .bind(&record.sequencing_status)
    .bind(&record.original_id)
    .bind(&record.chinese_name)
    .bind(&record.phylum)
    .bind(&record.phylum_name)
    .bind(&record.class)
    .bind(&record.class_name)
    .bind(&record.order)
    .bind(&record.order_name)
    .bind(&record.chinese_family_name)
    .bind(&record.family_name)
    .bind(&record.genus_name)
    .bind(&record.species_name)
    .bind(&record.infraspecies_name)
    .bind(&record.citation1)
    .bind(&record.citation2)
    .bind(&record.resource_code)
    .bind(&record.country)
    .bind(&record.province)
    .bind(&record.province_code)
    .bind(&record.county)
    .bind(&record.locality)
    .bind(record.longitude)
    .bind(record.latitude)
    .bind(record.altitude)
    .bind(&record.description)
    .bind(&record.habitat)
    .bind(&record.host)
    .bind(&record.image_url)
    .bind(&record.record_address)
    .bind(&record.preservation_institution)
    .bind(&record.institution_code)
    .bind(&record.collector)
    .bind(record.collection_date)
    .bind(&record.collection_number)
    .bind(&record.specimen_number)
    .bind(&record.identifier)
    .bind(record.identification_date)
    .bind(&record.specimen_attribute)
    .bind(&record.preservation_method)
    .bind(&record.physical_state)
    .bind(&record.sharing_method)
    .bind(&record.access_method)
    .bind(&record.literature)
    .bind(&record.contact_person)
    .bind(&record.institution_address)
    .bind(&record.postcode)
    .bind(&record.phone)
    .bind(&record.email)
    .bind(&record.project_name)
    .bind(&record.project_code)
    .bind(record.report_date)
    .bind(&record.sampling_point)
    .bind(&record.gene_code)
    .bind(&record.gene_name)
    .bind(&record.gene_description)
    .bind(&record.gene_alias)
    .bind(record.sequencing_date)
    .bind(&record.sequencer)
    .bind(&record.project_task_code)
    .bind(Utc::now())
    .bind(record.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_insect(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM insect_records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_insect(pool: &SqlitePool, id: i64) -> Result<Option<InsectRecord>> {
    let record = sqlx::query_as::<_, InsectRecord>("SELECT * FROM insect_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(record)
}

pub async fn count_insects(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM insect_records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn list_all_insects(pool: &SqlitePool) -> Result<Vec<InsectRecord>> {
    let records = sqlx::query_as::<_, InsectRecord>("SELECT * FROM insect_records ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(records)
}

fn push_insect_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &InsectFilter) {
    if let Some(q) = filter.q.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{q}%");
        qb.push(" AND (chinese_name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR species_name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR family_name LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(family) = filter.family.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND family_name = ");
        qb.push_bind(family.to_string());
    }
    if let Some(province) = filter.province.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND province = ");
        qb.push_bind(province.to_string());
    }
    if let Some(start) = filter.collection_date_start {
        qb.push(" AND collection_date >= ");
        qb.push_bind(start);
    }
    if let Some(end) = filter.collection_date_end {
        qb.push(" AND collection_date <= ");
        qb.push_bind(end);
    }
}

pub async fn list_insects(
    pool: &SqlitePool,
    filter: &InsectFilter,
    page: i64,
    per_page: i64,
) -> Result<Page<InsectRecord>> {
    let page = page.max(1);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM insect_records WHERE 1=1");
    push_insect_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM insect_records WHERE 1=1");
    push_insect_filters(&mut qb, filter);
    qb.push(" ORDER BY id LIMIT ");
    qb.push_bind(per_page);
    qb.push(" OFFSET ");
    qb.push_bind((page - 1) * per_page);
    let items = qb.build_query_as::<InsectRecord>().fetch_all(pool).await?;

    Ok(Page {
        items,
        page,
        per_page,
        total,
        total_pages: (total + per_page - 1) / per_page.max(1),
    })
}

pub async fn search_insects(
    pool: &SqlitePool,
    filter: &InsectFilter,
    limit: i64,
) -> Result<Vec<InsectRecord>> {
    let mut qb = QueryBuilder::new("SELECT * FROM insect_records WHERE 1=1");
    push_insect_filters(&mut qb, filter);
    qb.push(" ORDER BY id LIMIT ");
    qb.push_bind(limit);
    let records = qb.build_query_as::<InsectRecord>().fetch_all(pool).await?;
    Ok(records)
}

// ============ Filter options and statistics ============

async fn distinct_values(pool: &SqlitePool, sql: &str) -> Result<Vec<String>> {
    let values: Vec<String> = sqlx::query_scalar(sql).fetch_all(pool).await?;
    Ok(values)
}

pub async fn plant_families(pool: &SqlitePool) -> Result<Vec<String>> {
    distinct_values(
        pool,
        "SELECT DISTINCT family FROM plant_records \
         WHERE family IS NOT NULL AND family != '' ORDER BY family",
    )
    .await
}

pub async fn plant_countries(pool: &SqlitePool) -> Result<Vec<String>> {
    distinct_values(
        pool,
        "SELECT DISTINCT country FROM plant_records \
         WHERE country IS NOT NULL AND country != '' ORDER BY country",
    )
    .await
}

pub async fn plant_habitats(pool: &SqlitePool) -> Result<Vec<String>> {
    distinct_values(
        pool,
        "SELECT DISTINCT habitat FROM plant_records \
         WHERE habitat IS NOT NULL AND habitat != '' ORDER BY habitat",
    )
    .await
}

pub async fn insect_family_names(pool: &SqlitePool) -> Result<Vec<String>> {
    distinct_values(
        pool,
        "SELECT DISTINCT family_name FROM insect_records \
         WHERE family_name IS NOT NULL AND family_name != '' ORDER BY family_name",
    )
    .await
}

pub async fn insect_provinces(pool: &SqlitePool) -> Result<Vec<String>> {
    distinct_values(
        pool,
        "SELECT DISTINCT province FROM insect_records \
         WHERE province IS NOT NULL AND province != '' ORDER BY province",
    )
    .await
}

#[derive(Debug)]
pub struct CatalogStats {
    pub plant_count: i64,
    pub insect_count: i64,
    pub family_count: i64,
    pub country_count: i64,
}

pub async fn catalog_stats(pool: &SqlitePool) -> Result<CatalogStats> {
    let plant_count = count_plants(pool).await?;
    let insect_count = count_insects(pool).await?;
    let family_count: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT family) FROM plant_records WHERE family IS NOT NULL")
            .fetch_one(pool)
            .await?;
    let country_count: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT country) FROM plant_records WHERE country IS NOT NULL")
            .fetch_one(pool)
            .await?;

    Ok(CatalogStats {
        plant_count,
        insect_count,
        family_count,
        country_count,
    })
}
