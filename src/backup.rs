//! Whole-workspace backup: the sqlite file plus a manifest, zipped.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/reportcard.sqlite3";
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
pub const BUNDLE_FORMAT_V1: &str = "reportcard-workspace-v1";
pub const RAW_SQLITE_FORMAT: &str = "raw-sqlite3";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleManifest {
    format: String,
    #[serde(default)]
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exported_at: Option<String>,
    #[serde(default)]
    db_sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Zip the workspace database together with a manifest carrying its checksum.
pub fn export_workspace_bundle(
    workspace_path: &Path,
    db_file_name: &str,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(db_file_name);
    if !db_path.is_file() {
        bail!("workspace database not found: {}", db_path.display());
    }
    let db_bytes =
        std::fs::read(&db_path).with_context(|| format!("reading {}", db_path.display()))?;

    let manifest = BundleManifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        version: 1,
        app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        exported_at: Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        db_sha256: Some(sha256_hex(&db_bytes)),
    };
    let manifest_json =
        serde_json::to_vec_pretty(&manifest).context("serializing bundle manifest")?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let out_file =
        File::create(out_path).with_context(|| format!("creating {}", out_path.display()))?;

    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in [
        (MANIFEST_ENTRY, manifest_json.as_slice()),
        (DB_ENTRY, db_bytes.as_slice()),
    ] {
        zip.start_file(name, opts)
            .with_context(|| format!("starting bundle entry {name}"))?;
        zip.write_all(bytes)
            .with_context(|| format!("writing bundle entry {name}"))?;
    }
    zip.finish().context("finalizing bundle")?;

    Ok(ExportSummary {
        bundle_format: manifest.format,
        entry_count: 2,
        db_sha256: manifest.db_sha256.unwrap_or_default(),
    })
}

/// Restore a workspace database from a bundle, or from a bare sqlite file.
///
/// The database entry is checked against the manifest checksum before it
/// replaces the current file.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
    db_file_name: &str,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path)
        .with_context(|| format!("creating workspace {}", workspace_path.display()))?;
    let dst = workspace_path.join(db_file_name);

    if !has_zip_signature(in_path)? {
        std::fs::copy(in_path, &dst).with_context(|| {
            format!("copying {} to {}", in_path.display(), dst.display())
        })?;
        return Ok(ImportSummary {
            bundle_format_detected: RAW_SQLITE_FORMAT.to_string(),
        });
    }

    let in_file =
        File::open(in_path).with_context(|| format!("opening bundle {}", in_path.display()))?;
    let mut archive = ZipArchive::new(in_file).context("bundle is not a readable zip")?;

    let manifest: BundleManifest = {
        let entry = archive
            .by_name(MANIFEST_ENTRY)
            .context("bundle has no manifest.json")?;
        serde_json::from_reader(entry).context("manifest.json is not a valid manifest")?
    };
    if manifest.format != BUNDLE_FORMAT_V1 {
        bail!("unsupported bundle format: {}", manifest.format);
    }

    let mut db_bytes = Vec::new();
    archive
        .by_name(DB_ENTRY)
        .with_context(|| format!("bundle has no {DB_ENTRY}"))?
        .read_to_end(&mut db_bytes)
        .context("extracting database entry")?;

    if let Some(expected) = manifest.db_sha256.as_deref() {
        let actual = sha256_hex(&db_bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            bail!("database checksum mismatch: expected {expected}, got {actual}");
        }
    }

    let staged = workspace_path.join(format!("{db_file_name}.importing"));
    std::fs::write(&staged, &db_bytes)
        .with_context(|| format!("writing {}", staged.display()))?;
    std::fs::rename(&staged, &dst)
        .with_context(|| format!("replacing {}", dst.display()))?;

    Ok(ImportSummary {
        bundle_format_detected: manifest.format,
    })
}

fn has_zip_signature(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut sig = [0u8; 4];
    match f.read_exact(&mut sig) {
        Ok(()) => Ok(sig == ZIP_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e).context("reading file signature"),
    }
}
