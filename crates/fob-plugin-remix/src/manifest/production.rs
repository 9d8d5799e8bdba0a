use super::{BuildManifest, RouteManifestEntry, classify_routes, route_exports};
use crate::assets::{BuildAssets, BundlerManifest, resolve_build_asset_paths};
use crate::context::RemixContext;
use crate::error::{Error, Result};
use crate::exports::ModuleIntrospector;
use crate::route::{Route, RouteManifest};
use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A fingerprinted manifest and the file it was written to.
#[derive(Debug, Clone)]
pub struct ProductionManifest {
    pub manifest: BuildManifest,
    pub path: PathBuf,
}

#[derive(Serialize)]
struct Fingerprinted<'a> {
    entry: &'a BuildAssets,
    routes: &'a IndexMap<String, RouteManifestEntry>,
}

/// Build the production manifest from the client build's chunk manifest and
/// write it to `<client build>/<assetsDir>/manifest-<hash>.js`.
///
/// The returned manifest is only handed out after the file is fully in place.
pub async fn synthesize_production_manifest(
    ctx: &RemixContext,
    introspector: &dyn ModuleIntrospector,
) -> Result<ProductionManifest> {
    let bundler_manifest = BundlerManifest::read(&ctx.bundler_manifest_path()).await?;
    let manifest = build_production_manifest(ctx, introspector, &bundler_manifest).await?;
    let path = write_manifest_file(ctx, &manifest).await?;

    if ctx.options.manifest {
        write_build_report(ctx).await?;
    }

    Ok(ProductionManifest { manifest, path })
}

/// The in-memory production manifest; nothing is written.
pub async fn build_production_manifest(
    ctx: &RemixContext,
    introspector: &dyn ModuleIntrospector,
    bundler_manifest: &BundlerManifest,
) -> Result<BuildManifest> {
    let public_path = &ctx.options.public_path;
    let root = &ctx.root_directory;

    let entry = resolve_build_asset_paths(
        bundler_manifest,
        root,
        public_path,
        &ctx.entry_client_file,
        &[],
    )?;

    let exports = classify_routes(ctx, introspector).await?;

    let mut routes = IndexMap::with_capacity(ctx.routes.len());
    for route in ctx.routes.iter() {
        let prepended: Vec<&Path> = if route.is_root() {
            vec![ctx.entry_client_file.as_path()]
        } else {
            Vec::new()
        };
        let assets = resolve_build_asset_paths(
            bundler_manifest,
            root,
            public_path,
            &ctx.route_file(route),
            &prepended,
        )?;
        let entry = RouteManifestEntry::new(route, route_exports(&exports, route)?, assets);
        routes.insert(route.id.clone(), entry);
    }

    let version = fingerprint(&entry, &routes)?;
    let url = format!(
        "{}{}",
        public_path,
        manifest_file_name(&ctx.options.assets_dir, &version)
    );

    Ok(BuildManifest {
        entry,
        routes,
        version,
        url,
        hmr: None,
    })
}

/// First 8 hex characters of SHA-256 over the JSON of `{entry, routes}`.
pub fn fingerprint(
    entry: &BuildAssets,
    routes: &IndexMap<String, RouteManifestEntry>,
) -> Result<String> {
    let json = serde_json::to_string(&Fingerprinted { entry, routes })?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    Ok(hash[..8].to_string())
}

fn manifest_file_name(assets_dir: &str, version: &str) -> String {
    format!("{}/manifest-{}.js", assets_dir.trim_matches('/'), version)
}

async fn write_manifest_file(ctx: &RemixContext, manifest: &BuildManifest) -> Result<PathBuf> {
    let path = ctx
        .client_build_directory()
        .join(manifest_file_name(&ctx.options.assets_dir, &manifest.version));
    write_atomic(&path, manifest.to_browser_script()?.as_bytes()).await?;

    tracing::info!(
        path = %path.display(),
        version = %manifest.version,
        routes = manifest.routes.len(),
        "wrote production manifest"
    );
    Ok(path)
}

/// Write to a sibling temp file, then rename over `path`.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::io(path, std::io::Error::other("path has no parent directory")))?;
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = parent.join(format!(".{}.tmp", file_name));
    tokio::fs::write(&temp, content)
        .await
        .map_err(|e| Error::io(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Route and server bundle layout, written when `manifest` is enabled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub routes: RouteManifest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_bundles: Option<IndexMap<String, ServerBundle>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id_to_server_bundle_id: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerBundle {
    pub id: String,
    /// Server build file, relative to the project root
    pub file: String,
}

/// Assign every leaf route's branch to a server bundle.
pub fn build_report(ctx: &RemixContext) -> BuildReport {
    let Some(server_bundles) = &ctx.options.server_bundles else {
        return BuildReport {
            routes: ctx.routes.clone(),
            server_bundles: None,
            route_id_to_server_bundle_id: None,
        };
    };

    let mut bundles = IndexMap::new();
    let mut assignments = IndexMap::new();
    for leaf in ctx.routes.iter().filter(|route| is_leaf(&ctx.routes, route)) {
        let branch: Vec<Route> = ctx.routes.branch(&leaf.id).into_iter().cloned().collect();
        let bundle_id = (server_bundles.0)(branch.as_slice());
        let file = ctx
            .server_build_directory()
            .join(&bundle_id)
            .join(&ctx.options.server_build_file);
        bundles
            .entry(bundle_id.clone())
            .or_insert_with(|| ServerBundle {
                id: bundle_id.clone(),
                file: ctx.root_relative(&file),
            });
        assignments.insert(leaf.id.clone(), bundle_id);
    }

    BuildReport {
        routes: ctx.routes.clone(),
        server_bundles: Some(bundles),
        route_id_to_server_bundle_id: Some(assignments),
    }
}

fn is_leaf(routes: &RouteManifest, route: &Route) -> bool {
    !routes
        .iter()
        .any(|other| other.parent_id.as_deref() == Some(route.id.as_str()))
}

async fn write_build_report(ctx: &RemixContext) -> Result<PathBuf> {
    let path = ctx.build_directory().join(".vite").join("remix-manifest.json");
    let json = serde_json::to_string_pretty(&build_report(ctx))?;
    write_atomic(&path, json.as_bytes()).await?;
    tracing::info!(path = %path.display(), "wrote build report");
    Ok(path)
}
