use crate::calc::ReportCardData;
use crate::model::SchoolInfo;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const EXPORT_FORMAT_V1: &str = "reportcard-export-v1";

const MANIFEST_ENTRY: &str = "manifest.json";
const SCHOOL_ENTRY: &str = "school.json";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{slot} is not a readable image: {reason}")]
    InvalidLogo { slot: &'static str, reason: String },

    #[error("export io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("export archive failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("export serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub report_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLogo {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

fn sniff_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else {
        "bin"
    }
}

/// Decode a logo stored as a `data:<mime>;base64,<payload>` URL or as bare base64.
pub fn decode_logo(slot: &'static str, raw: &str) -> Result<DecodedLogo, ExportError> {
    let raw = raw.trim();
    let (mime, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let Some((header, payload)) = rest.split_once(',') else {
                return Err(ExportError::InvalidLogo {
                    slot,
                    reason: "data URL has no payload".into(),
                });
            };
            let Some(mime) = header.strip_suffix(";base64") else {
                return Err(ExportError::InvalidLogo {
                    slot,
                    reason: "data URL is not base64 encoded".into(),
                });
            };
            (Some(mime), payload)
        }
        None => (None, raw),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ExportError::InvalidLogo {
            slot,
            reason: e.to_string(),
        })?;
    if bytes.is_empty() {
        return Err(ExportError::InvalidLogo {
            slot,
            reason: "image is empty".into(),
        });
    }

    let extension = match mime {
        Some(m) if extension_for_mime(m) != "bin" => extension_for_mime(m),
        _ => sniff_extension(&bytes),
    };
    Ok(DecodedLogo { extension, bytes })
}

fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "student".to_string()
    } else {
        cleaned
    }
}

fn report_entry_name(report: &ReportCardData) -> String {
    format!(
        "reports/{}-{}.json",
        sanitize_component(&report.admission_number),
        sanitize_component(&report.id)
    )
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Write report cards and the school header into a zip at `out_path`.
///
/// Logos are decoded before anything touches disk. If writing fails midway the
/// partial file is removed.
pub fn export_report_bundle(
    out_path: &Path,
    reports: &[ReportCardData],
    school: &SchoolInfo,
) -> Result<ExportSummary, ExportError> {
    let mut logos = Vec::new();
    if let Some(raw) = school.logo1.as_deref() {
        logos.push(("logo1", decode_logo("logo1", raw)?));
    }
    if let Some(raw) = school.logo2.as_deref() {
        logos.push(("logo2", decode_logo("logo2", raw)?));
    }

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let result = write_bundle(out_path, reports, school, &logos);
    if result.is_err() {
        let _ = std::fs::remove_file(out_path);
    }
    result
}

fn write_bundle(
    out_path: &Path,
    reports: &[ReportCardData],
    school: &SchoolInfo,
    logos: &[(&str, DecodedLogo)],
) -> Result<ExportSummary, ExportError> {
    let out_file = File::create(out_path)?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::new();

    // Logos travel as files; keep the JSON header free of the base64 blobs.
    let school_header = json!({
        "name": school.name,
        "address": school.address,
        "logos": logos
            .iter()
            .map(|(slot, logo)| json!({
                "slot": slot,
                "path": format!("logos/{}.{}", slot, logo.extension),
            }))
            .collect::<Vec<_>>(),
    });
    let school_bytes = serde_json::to_vec_pretty(&school_header)?;
    zip.start_file(SCHOOL_ENTRY, opts)?;
    zip.write_all(&school_bytes)?;
    entries.push(json!({ "path": SCHOOL_ENTRY, "sha256": sha256_hex(&school_bytes) }));

    for (slot, logo) in logos {
        let path = format!("logos/{}.{}", slot, logo.extension);
        zip.start_file(path.as_str(), opts)?;
        zip.write_all(&logo.bytes)?;
        entries.push(json!({ "path": path, "sha256": sha256_hex(&logo.bytes) }));
    }

    for report in reports {
        let path = report_entry_name(report);
        let bytes = serde_json::to_vec_pretty(report)?;
        zip.start_file(path.as_str(), opts)?;
        zip.write_all(&bytes)?;
        entries.push(json!({
            "path": path,
            "studentId": report.id,
            "sha256": sha256_hex(&bytes),
        }));
    }

    let manifest = json!({
        "format": EXPORT_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        "reportCount": reports.len(),
        "entries": entries,
    });
    zip.start_file(MANIFEST_ENTRY, opts)?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

    zip.finish()?;

    Ok(ExportSummary {
        bundle_format: EXPORT_FORMAT_V1.to_string(),
        entry_count: entries.len() + 1,
        report_count: reports.len(),
    })
}
