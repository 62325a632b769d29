//! Bulk CSV import for the two specimen feeds.
//!
//! Rows are staged inside a transaction and committed in batches of
//! [`BATCH_SIZE`]. A bad row (malformed CSV record or failed insert) is
//! reported and skipped; it never aborts the run. The insect feed arrives in
//! a GB-family encoding more often than not, so its bytes go through a
//! decode ladder before parsing.

use anyhow::{bail, Context, Result};
use encoding_rs::{GB18030, GBK, UTF_8};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::path::Path;

use crate::insect::InsectRecord;
use crate::plant::PlantRecord;
use crate::store;

/// Rows per transaction commit during bulk import.
pub const BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Plants,
    Insects,
}

impl Feed {
    pub fn name(&self) -> &'static str {
        match self {
            Feed::Plants => "plants",
            Feed::Insects => "insects",
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
    pub commits: usize,
}

/// Column headers of the insect feed mapped to their external field names.
/// Headers not listed here pass through unchanged and are dropped by the
/// record mapper if still unknown.
const INSECT_HEADERS: &[(&str, &str)] = &[
    ("序列号", "serialNumber"),
    ("Leiqun", "leiqun"),
    ("测序状态", "sequencingStatus"),
    ("Id", "originalId"),
    ("中名", "chineseName"),
    ("门", "phylum"),
    ("门名称", "phylumName"),
    ("纲", "class"),
    ("纲名称", "className"),
    ("目", "order"),
    ("目名称", "orderName"),
    ("中文科名", "chineseFamilyName"),
    ("科名称", "familyName"),
    ("属名", "genusName"),
    ("种本名", "speciesName"),
    ("种下名称", "infraspeciesName"),
    ("Cite1", "citation1"),
    ("Cite2", "citation2"),
    ("资源编码", "resourceCode"),
    ("国家", "country"),
    ("省", "province"),
    ("省代码", "provinceCode"),
    ("县", "county"),
    ("具体地点", "locality"),
    ("经度", "longitude"),
    ("纬度", "latitude"),
    ("海拔", "altitude"),
    ("描述", "description"),
    ("生境", "habitat"),
    ("寄主", "host"),
    ("图像", "imageUrl"),
    ("记录地址", "recordAddress"),
    ("保存单位", "preservationInstitution"),
    ("单位代码", "institutionCode"),
    ("采集人", "collector"),
    ("采集时间", "collectionDate"),
    ("采集号", "collectionNumber"),
    ("标本号", "specimenNumber"),
    ("鉴定人", "identifier"),
    ("鉴定时间", "identificationDate"),
    ("标本属性", "specimenAttribute"),
    ("保藏方式", "preservationMethod"),
    ("实物状态", "physicalState"),
    ("共享方式", "sharingMethod"),
    ("获取途径", "accessMethod"),
    ("文献", "literature"),
    ("联系人", "contactPerson"),
    ("单位地址", "institutionAddress"),
    ("邮编", "postcode"),
    ("电话", "phone"),
    ("Email", "email"),
    ("项目名称", "projectName"),
    ("项目编号", "projectCode"),
    ("上报时间", "reportDate"),
    ("取材点", "samplingPoint"),
    ("基因编号", "geneCode"),
    ("基因名称", "geneName"),
    ("基因描述", "geneDescription"),
    ("基因别名", "geneAlias"),
    ("测序时间", "sequencingDate"),
    ("测序人", "sequencer"),
    ("课题代码", "projectTaskCode"),
];

/// Decodes raw feed bytes, trying UTF-8 (with or without BOM) first, then
/// the GB family. Bytes that fit none of them are an error.
pub fn decode_feed_bytes(bytes: &[u8]) -> Result<String> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return Ok(text.into_owned());
    }
    for encoding in [GBK, GB18030] {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if !had_errors {
            return Ok(text.into_owned());
        }
    }
    bail!("Could not decode feed bytes as UTF-8, GBK, or GB18030")
}

fn external_key(feed: Feed, header: &str) -> String {
    let header = header.trim();
    match feed {
        Feed::Plants => header.to_string(),
        Feed::Insects => INSECT_HEADERS
            .iter()
            .find(|(cn, _)| *cn == header)
            .map(|(_, en)| en.to_string())
            .unwrap_or_else(|| header.to_string()),
    }
}

fn row_to_raw(headers: &[String], row: &csv::StringRecord) -> HashMap<String, String> {
    headers
        .iter()
        .zip(row.iter())
        .map(|(header, value)| (header.clone(), value.to_string()))
        .collect()
}

async fn stage_row(
    tx: &mut Transaction<'_, Sqlite>,
    feed: Feed,
    raw: &HashMap<String, String>,
) -> Result<()> {
    match feed {
        Feed::Plants => {
            store::insert_plant(&mut **tx, &PlantRecord::from_external(raw)).await?;
        }
        Feed::Insects => {
            store::insert_insect(&mut **tx, &InsectRecord::from_external(raw)).await?;
        }
    }
    Ok(())
}

/// Imports one feed from decoded CSV text.
pub async fn import_text(pool: &SqlitePool, feed: Feed, text: &str) -> Result<ImportReport> {
    let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header row")?
        .iter()
        .map(|h| external_key(feed, h))
        .collect();

    let mut report = ImportReport::default();
    let mut tx = pool.begin().await?;
    let mut staged = 0usize;

    for (index, row) in reader.records().enumerate() {
        // Header is line 1, so the first data row is line 2.
        let line = index + 2;
        let outcome = match row {
            Ok(row) => stage_row(&mut tx, feed, &row_to_raw(&headers, &row)).await,
            Err(err) => Err(err.into()),
        };
        match outcome {
            Ok(()) => {
                report.imported += 1;
                staged += 1;
                if staged >= BATCH_SIZE {
                    tx.commit().await?;
                    report.commits += 1;
                    staged = 0;
                    tx = pool.begin().await?;
                    println!("  {}: committed {} records", feed.name(), report.imported);
                }
            }
            Err(err) => {
                report.failed += 1;
                eprintln!("  {}: skipping row {line}: {err}", feed.name());
            }
        }
    }

    if staged > 0 {
        tx.commit().await?;
        report.commits += 1;
    } else {
        tx.rollback().await?;
    }

    Ok(report)
}

/// Imports one feed from a file on disk. The insect feed goes through the
/// encoding ladder; the plant feed is expected to be UTF-8.
pub async fn import_file(pool: &SqlitePool, feed: Feed, path: &Path) -> Result<ImportReport> {
    let text = match feed {
        Feed::Plants => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        Feed::Insects => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            decode_feed_bytes(&bytes)
                .with_context(|| format!("Failed to decode {}", path.display()))?
        }
    };
    import_text(pool, feed, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_with_bom_decodes() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice("序列号,中名\n".as_bytes());
        let text = decode_feed_bytes(&bytes).unwrap();
        assert!(text.starts_with("序列号"));
    }

    #[test]
    fn gbk_bytes_decode() {
        let (bytes, _, _) = GBK.encode("中名,采集人\nA,张三\n");
        let text = decode_feed_bytes(&bytes).unwrap();
        assert!(text.contains("张三"));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(decode_feed_bytes(b"\x80\x81\xff").is_err());
    }

    #[test]
    fn insect_headers_translate() {
        assert_eq!(external_key(Feed::Insects, "采集时间"), "collectionDate");
        assert_eq!(external_key(Feed::Insects, " 中名 "), "chineseName");
        assert_eq!(external_key(Feed::Insects, "未知列"), "未知列");
    }

    #[test]
    fn plant_headers_pass_through() {
        assert_eq!(external_key(Feed::Plants, "scientificName"), "scientificName");
        assert_eq!(external_key(Feed::Plants, " family "), "family");
    }
}
