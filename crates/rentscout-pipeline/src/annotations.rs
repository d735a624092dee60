//! Import of externally produced per-listing annotations.
//!
//! Each file is `<listing id>.json` holding any of `is_modern`,
//! `has_elevator`, `is_flat`, `location` and `notes`. Flags are booleans or
//! the strings `"Y"`, `"N"` and `"?"` (unknown). Files go through the same
//! merging upsert as stage output, so re-importing is harmless.

use crate::error::Result;
use rentscout_core::{Annotations, ListingFields, ListingId};
use rentscout_db::{listings, Database};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of an annotation import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Files merged into an existing record
    pub imported: usize,
    /// Files naming a listing that is not in the store
    pub unknown: usize,
    /// Files that could not be read as annotations
    pub invalid: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn value(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
                "Y" | "YES" | "TRUE" => Some(true),
                "N" | "NO" | "FALSE" => Some(false),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnotationFile {
    is_modern: Option<Flag>,
    has_elevator: Option<Flag>,
    is_flat: Option<Flag>,
    location: Option<String>,
    notes: Option<String>,
}

impl AnnotationFile {
    fn into_annotations(self) -> Annotations {
        let text = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Annotations {
            is_modern: self.is_modern.as_ref().and_then(Flag::value),
            has_elevator: self.has_elevator.as_ref().and_then(Flag::value),
            is_flat: self.is_flat.as_ref().and_then(Flag::value),
            location_note: text(self.location),
            notes: text(self.notes),
        }
    }
}

/// Merge every `*.json` annotation file in `dir` into the record store.
///
/// # Errors
/// Fails if `dir` cannot be listed or a storage write fails. Individual
/// unreadable files are counted as invalid.
pub async fn import_annotations(db: &Database, dir: &Path) -> Result<ImportSummary> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut summary = ImportSummary::default();
    for path in paths {
        let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| ListingId::new(s).ok())
        else {
            warn!(path = %path.display(), "Annotation file name is not a listing ID");
            summary.invalid += 1;
            continue;
        };

        let file: AnnotationFile = match tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
        {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable annotation file");
                summary.invalid += 1;
                continue;
            }
        };

        if listings::get(db.pool(), &id).await?.is_none() {
            warn!(listing = %id, "Annotation for unknown listing ignored");
            summary.unknown += 1;
            continue;
        }

        let patch = ListingFields {
            annotations: file.into_annotations(),
            ..ListingFields::default()
        };
        listings::upsert(db.pool(), &id, &patch).await?;
        summary.imported += 1;
    }

    info!(
        imported = summary.imported,
        unknown = summary.unknown,
        invalid = summary.invalid,
        "Imported annotations"
    );
    Ok(summary)
}
