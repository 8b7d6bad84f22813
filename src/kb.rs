//! Knowledge-base directory scanning.
//!
//! A tenant's documents live under `<kb_root>/<tenant>/`. Files matching
//! the include globs are read as UTF-8 and returned sorted by relative
//! path, which becomes each chunk's `source`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use receptionist_kb_core::TenantId;

/// One document found in a knowledge-base directory.
#[derive(Debug, Clone, PartialEq)]
pub struct KbDocument {
    /// Path relative to the tenant directory, `/`-separated.
    pub source: String,
    pub path: PathBuf,
    pub text: String,
}

pub fn tenant_dir(kb_root: &Path, tenant: &TenantId) -> PathBuf {
    kb_root.join(tenant.as_str())
}

pub fn scan_knowledge_base(
    kb_root: &Path,
    tenant: &TenantId,
    include_globs: &[String],
) -> Result<Vec<KbDocument>> {
    let root = tenant_dir(kb_root, tenant);
    if !root.is_dir() {
        bail!(
            "Knowledge base directory does not exist: {}",
            root.display()
        );
    }

    let include_set = build_globset(include_globs)?;
    let mut docs = Vec::new();

    for entry in WalkDir::new(&root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(&root).unwrap_or(path);
        let source = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if !include_set.is_match(&source) {
            continue;
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        docs.push(KbDocument {
            source,
            path: path.to_path_buf(),
            text,
        });
    }

    // Sort for deterministic ordering
    docs.sort_by(|a, b| a.source.cmp(&b.source));

    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
