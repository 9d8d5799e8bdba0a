//! Per-route asset resolution from the client bundler manifest.
//!
//! The client build writes `.vite/manifest.json`: chunk records keyed by the
//! root-relative path of their input. Route inputs carry the client-route
//! query, so those keys are tried first.

use crate::error::{Error, Result};
use crate::route::CLIENT_ROUTE_QUERY;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chunk record written by the client build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestChunk {
    /// Output file relative to the client build directory
    pub file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default)]
    pub is_entry: bool,

    /// Keys of statically imported chunks
    #[serde(default)]
    pub imports: Vec<String>,

    #[serde(default)]
    pub dynamic_imports: Vec<String>,

    /// Stylesheets relative to the client build directory
    #[serde(default)]
    pub css: Vec<String>,

    #[serde(default)]
    pub assets: Vec<String>,
}

/// The client build's chunk manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundlerManifest {
    chunks: IndexMap<String, ManifestChunk>,
}

impl BundlerManifest {
    pub fn new(chunks: impl IntoIterator<Item = (String, ManifestChunk)>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }

    /// Read the manifest the client build wrote to `path`.
    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn get(&self, key: &str) -> Option<&ManifestChunk> {
        self.chunks.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.chunks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn entry_not_found(&self, key: &str) -> Error {
        Error::ManifestEntryNotFound {
            key: key.to_string(),
            known_keys: self.keys().map(str::to_string).collect(),
        }
    }

    fn chunk_ref<'a>(&'a self, key: &str) -> Option<ChunkRef<'a>> {
        self.chunks
            .get_key_value(key)
            .map(|(key, chunk)| ChunkRef { key, chunk })
    }
}

/// A chunk together with its manifest key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRef<'a> {
    pub key: &'a str,
    pub chunk: &'a ManifestChunk,
}

/// Script and stylesheet URLs for one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAssets {
    pub module: String,
    pub imports: Vec<String>,
    pub css: Vec<String>,
}

/// Path of `path` relative to `root`, with forward slashes.
///
/// Paths outside `root` are returned whole.
pub fn root_relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Find the chunk for `file`, preferring the client-route key.
pub fn resolve_chunk<'a>(
    manifest: &'a BundlerManifest,
    root: &Path,
    file: &Path,
) -> Result<ChunkRef<'a>> {
    let key = root_relative_path(root, file);
    manifest
        .chunk_ref(&format!("{}{}", key, CLIENT_ROUTE_QUERY))
        .or_else(|| manifest.chunk_ref(&key))
        .ok_or_else(|| manifest.entry_not_found(&key))
}

/// Every chunk reachable from `entries` over static imports, entries included.
///
/// Each chunk is walked once, so import cycles terminate.
pub fn resolve_dependant_chunks<'a>(
    manifest: &'a BundlerManifest,
    entries: &[ChunkRef<'a>],
) -> Result<Vec<ChunkRef<'a>>> {
    let mut visited: FxHashSet<&'a str> = FxHashSet::default();
    let mut chunks = Vec::new();
    let mut stack: Vec<ChunkRef<'a>> = entries.iter().rev().copied().collect();

    while let Some(current) = stack.pop() {
        if !visited.insert(current.key) {
            continue;
        }
        chunks.push(current);
        for import in current.chunk.imports.iter().rev() {
            if visited.contains(import.as_str()) {
                continue;
            }
            let next = manifest
                .chunk_ref(import)
                .ok_or_else(|| manifest.entry_not_found(import))?;
            stack.push(next);
        }
    }

    Ok(chunks)
}

/// Resolve the asset URLs of `entry_file`.
///
/// Chunks of `prepended_files` seed the walk ahead of the entry; the root
/// route uses this to carry the client entry's global assets.
pub fn resolve_build_asset_paths(
    manifest: &BundlerManifest,
    root: &Path,
    public_path: &str,
    entry_file: &Path,
    prepended_files: &[&Path],
) -> Result<BuildAssets> {
    let entry = resolve_chunk(manifest, root, entry_file)?;
    let mut seeds = prepended_files
        .iter()
        .map(|file| resolve_chunk(manifest, root, file))
        .collect::<Result<Vec<_>>>()?;
    seeds.push(entry);

    let chunks = resolve_dependant_chunks(manifest, &seeds)?;

    let import_keys: IndexSet<&str> = chunks
        .iter()
        .flat_map(|c| c.chunk.imports.iter().map(String::as_str))
        .collect();
    let imports = import_keys
        .into_iter()
        .map(|key| {
            manifest
                .get(key)
                .map(|chunk| format!("{}{}", public_path, chunk.file))
                .ok_or_else(|| manifest.entry_not_found(key))
        })
        .collect::<Result<Vec<_>>>()?;

    let css: IndexSet<&str> = chunks
        .iter()
        .flat_map(|c| c.chunk.css.iter().map(String::as_str))
        .collect();

    Ok(BuildAssets {
        module: format!("{}{}", public_path, entry.chunk.file),
        imports,
        css: css
            .into_iter()
            .map(|href| format!("{}{}", public_path, href))
            .collect(),
    })
}
