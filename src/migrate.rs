use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plant_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            classification TEXT,
            kingdom TEXT,
            chinese_kingdom_name TEXT,
            family TEXT,
            chinese_family_name TEXT,
            genus TEXT,
            chinese_genus_name TEXT,
            scientific_name TEXT,
            vernacular_name TEXT,
            identification_id TEXT,
            recorded_by TEXT,
            record_number TEXT,
            event_date TEXT,
            identified_by TEXT,
            country TEXT,
            state_province TEXT,
            city TEXT,
            county TEXT,
            locality TEXT,
            decimal_latitude REAL,
            decimal_longitude REAL,
            minimum_elevation_in_meters REAL,
            habitat TEXT,
            habit TEXT,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS insect_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            serial_number TEXT,
            leiqun TEXT,
            sequencing_status TEXT,
            original_id TEXT,
            chinese_name TEXT,
            phylum TEXT,
            phylum_name TEXT,
            class TEXT,
            class_name TEXT,
            "order" TEXT,
            order_name TEXT,
            chinese_family_name TEXT,
            family_name TEXT,
            genus_name TEXT,
            species_name TEXT,
            infraspecies_name TEXT,
            citation1 TEXT,
            citation2 TEXT,
            resource_code TEXT,
            country TEXT,
            province TEXT,
            province_code TEXT,
            county TEXT,
            locality TEXT,
            longitude REAL,
            latitude REAL,
            altitude REAL,
            description TEXT,
            habitat TEXT,
            host TEXT,
            image_url TEXT,
            record_address TEXT,
            preservation_institution TEXT,
            institution_code TEXT,
            collector TEXT,
            collection_date TEXT,
            collection_number TEXT,
            specimen_number TEXT,
            identifier TEXT,
            identification_date TEXT,
            specimen_attribute TEXT,
            preservation_method TEXT,
            physical_state TEXT,
            sharing_method TEXT,
            access_method TEXT,
            literature TEXT,
            contact_person TEXT,
            institution_address TEXT,
            postcode TEXT,
            phone TEXT,
            email TEXT,
            project_name TEXT,
            project_code TEXT,
            report_date TEXT,
            sampling_point TEXT,
            gene_code TEXT,
            gene_name TEXT,
            gene_description TEXT,
            gene_alias TEXT,
            sequencing_date TEXT,
            sequencer TEXT,
            project_task_code TEXT,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for the common list filters
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_plant_family ON plant_records(family)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_plant_country ON plant_records(country)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_insect_family_name ON insect_records(family_name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_insect_province ON insect_records(province)")
        .execute(pool)
        .await?;

    Ok(())
}
