//! First-run orchestration: migrate the schema, then fill each table from
//! its CSV feed. A table that already holds data is left alone. If a feed is
//! missing or cannot be imported, a small built-in sample is seeded instead
//! so the catalog is never empty.

use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::config::Config;
use crate::import::{self, Feed};
use crate::insect::InsectRecord;
use crate::migrate;
use crate::plant::PlantRecord;
use crate::store;

fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn sample_plants() -> Vec<PlantRecord> {
    vec![
        PlantRecord::from_external(&raw(&[
            ("scientificName", "Rosa chinensis"),
            ("vernacularName", "月季"),
            ("family", "Rosaceae"),
            ("chineseFamilyName", "蔷薇科"),
            ("genus", "Rosa"),
            ("chineseGenusName", "蔷薇属"),
            ("identificationID", "ICN001"),
            ("recordedBy", "张三"),
            ("recordNumber", "RC2023001"),
            ("eventDate", "2023-05-10"),
            ("identifiedBy", "李四"),
            ("country", "中国"),
            ("stateProvince", "云南省"),
            ("city", "昆明市"),
            ("county", "呈贡区"),
            ("decimalLatitude", "25.1367"),
            ("decimalLongitude", "102.7433"),
            ("minimumElevationInMeters", "1890"),
            ("habit", "灌木"),
        ])),
        PlantRecord::from_external(&raw(&[
            ("scientificName", "Bambusa multiplex"),
            ("vernacularName", "孝顺竹"),
            ("family", "Poaceae"),
            ("chineseFamilyName", "禾本科"),
            ("genus", "Bambusa"),
            ("chineseGenusName", "簕竹属"),
            ("identificationID", "ICN002"),
            ("recordedBy", "王五"),
            ("recordNumber", "BM2023001"),
            ("eventDate", "2023-06-15"),
            ("identifiedBy", "赵六"),
            ("country", "中国"),
            ("stateProvince", "广东省"),
            ("city", "广州市"),
            ("county", "天河区"),
            ("decimalLatitude", "23.1833"),
            ("decimalLongitude", "113.35"),
            ("minimumElevationInMeters", "25"),
            ("habit", "竹类"),
        ])),
    ]
}

fn sample_insects() -> Vec<InsectRecord> {
    vec![
        InsectRecord::from_external(&raw(&[
            ("serialNumber", "INS001"),
            ("chineseName", "中华蜜蜂"),
            ("phylum", "节肢动物门"),
            ("class", "昆虫纲"),
            ("order", "膜翅目"),
            ("familyName", "蜜蜂科"),
            ("genusName", "蜜蜂属"),
            ("speciesName", "Apis cerana"),
            ("country", "中国"),
            ("province", "云南省"),
            ("locality", "昆明市郊区"),
            ("habitat", "山区林地"),
            ("collector", "昆虫采集组"),
            ("collectionDate", "2023-6-15"),
        ])),
        InsectRecord::from_external(&raw(&[
            ("serialNumber", "INS002"),
            ("chineseName", "七星瓢虫"),
            ("phylum", "节肢动物门"),
            ("class", "昆虫纲"),
            ("order", "鞘翅目"),
            ("familyName", "瓢虫科"),
            ("genusName", "瓢虫属"),
            ("speciesName", "Coccinella septempunctata"),
            ("country", "中国"),
            ("province", "四川省"),
            ("locality", "成都市农田"),
            ("habitat", "农田生态系统"),
            ("collector", "昆虫采集组"),
            ("collectionDate", "2023-7-20"),
        ])),
    ]
}

async fn seed_plants(pool: &SqlitePool) -> Result<usize> {
    let samples = sample_plants();
    for record in &samples {
        store::insert_plant(pool, record).await?;
    }
    Ok(samples.len())
}

async fn seed_insects(pool: &SqlitePool) -> Result<usize> {
    let samples = sample_insects();
    for record in &samples {
        store::insert_insect(pool, record).await?;
    }
    Ok(samples.len())
}

async fn bootstrap_feed(config: &Config, pool: &SqlitePool, feed: Feed) -> Result<()> {
    let count = match feed {
        Feed::Plants => store::count_plants(pool).await?,
        Feed::Insects => store::count_insects(pool).await?,
    };
    if count > 0 {
        println!("{}: {} records present, skipping import", feed.name(), count);
        return Ok(());
    }

    let path = match feed {
        Feed::Plants => &config.data.plants_csv,
        Feed::Insects => &config.data.insects_csv,
    };

    if path.exists() {
        match import::import_file(pool, feed, path).await {
            Ok(report) => {
                println!(
                    "{}: imported {} records ({} failed)",
                    feed.name(),
                    report.imported,
                    report.failed
                );
                return Ok(());
            }
            Err(err) => {
                eprintln!("{}: import of {} failed: {err}", feed.name(), path.display());
            }
        }
    } else {
        println!("{}: no feed at {}", feed.name(), path.display());
    }

    let seeded = match feed {
        Feed::Plants => seed_plants(pool).await?,
        Feed::Insects => seed_insects(pool).await?,
    };
    println!("{}: seeded {} sample records", feed.name(), seeded);
    Ok(())
}

/// Runs migrations and fills any empty table from its feed or, failing that,
/// the built-in samples.
pub async fn run_bootstrap(config: &Config, pool: &SqlitePool) -> Result<()> {
    migrate::run_migrations(pool).await?;
    bootstrap_feed(config, pool, Feed::Plants).await?;
    bootstrap_feed(config, pool, Feed::Insects).await?;
    Ok(())
}
