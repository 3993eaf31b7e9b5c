//! Artifact Scanner
//!
//! Lists `*.apk` files directly inside `projectRoot/apkDir`. Paths are
//! normalized lexically and anything that would land outside the project root
//! is excluded.

use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use adcon_core::prelude::*;
use adcon_core::Artifact;

use crate::config::ProjectConfig;

/// Artifact file extension (matched case-insensitively)
const ARTIFACT_EXTENSION: &str = "apk";

/// Resolve `sub_path` against the project root.
///
/// Returns `None` when no root is configured or the result escapes the root.
/// A relative root is compared lexically, so the part below the root must
/// consist of plain names after normalization.
pub fn resolve_project_path(project: &ProjectConfig, sub_path: &Path) -> Option<PathBuf> {
    if project.project_root.is_empty() {
        return None;
    }
    let root = normalize(Path::new(&project.project_root));
    let candidate = normalize(&root.join(sub_path));
    let below_root = candidate.strip_prefix(&root).ok()?;
    if !below_root
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(candidate)
}

/// Scan the artifact directory, newest first.
///
/// Unset configuration or a missing directory yields an empty list.
pub fn list_artifacts(project: &ProjectConfig) -> Vec<Artifact> {
    if project.apk_dir.is_empty() {
        return Vec::new();
    }
    let Some(dir) = resolve_project_path(project, Path::new(&project.apk_dir)) else {
        return Vec::new();
    };

    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Artifact dir {:?} not readable: {}", dir, e);
            return Vec::new();
        }
    };

    let mut artifacts: Vec<Artifact> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !has_artifact_extension(&name) {
                return None;
            }
            let metadata = std::fs::metadata(entry.path()).ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some(Artifact {
                name,
                path: entry.path(),
                size: metadata.len(),
                mtime_ms: modified_millis(&metadata),
            })
        })
        .collect();

    artifacts.sort_by(|a, b| b.mtime_ms.cmp(&a.mtime_ms));
    artifacts
}

/// Resolve an artifact name to an existing file inside the artifact directory
pub fn find_artifact(project: &ProjectConfig, name: &str) -> Result<PathBuf> {
    if project.project_root.is_empty() || project.apk_dir.is_empty() {
        return Err(Error::validation("Configure APK directory first"));
    }

    let sub_path = Path::new(&project.apk_dir).join(name);
    match resolve_project_path(project, &sub_path) {
        Some(path) if path.is_file() => Ok(path),
        _ => {
            debug!("Artifact {:?} rejected or missing", name);
            Err(Error::not_found("Artifact not found"))
        }
    }
}

fn has_artifact_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
}

fn modified_millis(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// `..` only cancels a preceding name; leading `..` components of a relative
/// path are kept and `..` directly under the root is dropped.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
