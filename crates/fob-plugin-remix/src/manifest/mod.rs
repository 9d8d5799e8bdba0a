//! Build manifest synthesis.
//!
//! Production and development manifests share one shape. The production one
//! is derived from the client build's chunk manifest, fingerprinted and
//! written to disk; the development one points at source files and gets a
//! random version on every call.

pub mod development;
pub mod production;
pub mod server_entry;

use crate::assets::BuildAssets;
use crate::context::RemixContext;
use crate::error::{Error, Result};
use crate::exports::policy::validate_route_exports;
use crate::exports::{ModuleIntrospector, RouteCapabilities, RouteExportSet};
use crate::route::Route;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use development::{route_metadata, synthesize_development_manifest};
pub use production::{ProductionManifest, synthesize_production_manifest};
pub use server_entry::synthesize_server_entry_source;

/// Global the browser reads the manifest from.
pub const MANIFEST_GLOBAL: &str = "window.__remixManifest";

/// Route metadata and assets as the browser sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteManifestEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    pub has_action: bool,
    pub has_loader: bool,
    pub has_client_action: bool,
    pub has_client_loader: bool,
    pub has_error_boundary: bool,
    pub module: String,
    pub imports: Vec<String>,
    pub css: Vec<String>,
}

impl RouteManifestEntry {
    pub fn new(route: &Route, exports: &[String], assets: BuildAssets) -> Self {
        let caps = RouteCapabilities::from_exports(exports);
        Self {
            id: route.id.clone(),
            parent_id: route.parent_id.clone(),
            path: route.path.clone(),
            index: route.index,
            case_sensitive: route.case_sensitive,
            has_action: caps.has_action,
            has_loader: caps.has_loader,
            has_client_action: caps.has_client_action,
            has_client_loader: caps.has_client_loader,
            has_error_boundary: caps.has_error_boundary,
            module: assets.module,
            imports: assets.imports,
            css: assets.css,
        }
    }

    pub fn capabilities(&self) -> RouteCapabilities {
        RouteCapabilities {
            has_loader: self.has_loader,
            has_action: self.has_action,
            has_client_loader: self.has_client_loader,
            has_client_action: self.has_client_action,
            has_error_boundary: self.has_error_boundary,
        }
    }
}

/// Development-only hot module replacement settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HmrInfo {
    /// URL of the module installing the refresh runtime
    pub runtime: String,
}

/// Manifest of the client entry and every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub entry: BuildAssets,
    pub routes: IndexMap<String, RouteManifestEntry>,
    pub version: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmr: Option<HmrInfo>,
}

impl BuildManifest {
    /// Classic script assigning the manifest to the browser global.
    pub fn to_browser_script(&self) -> Result<String> {
        Ok(format!("{}={};", MANIFEST_GLOBAL, serde_json::to_string(self)?))
    }

    /// ES module exporting the manifest as its default export.
    pub fn to_server_module(&self) -> Result<String> {
        Ok(format!("export default {};", serde_json::to_string(self)?))
    }
}

/// Classify every route concurrently.
///
/// The first failure aborts the whole set; a partially classified set is
/// never returned.
pub async fn classify_routes(
    ctx: &RemixContext,
    introspector: &dyn ModuleIntrospector,
) -> Result<RouteExportSet> {
    let classified = futures::future::try_join_all(
        ctx.routes
            .iter()
            .map(|route| classify_route(ctx, introspector, route)),
    )
    .await?;

    Ok(ctx
        .routes
        .iter()
        .map(|route| route.id.clone())
        .zip(classified)
        .collect())
}

/// Exports of one route module, checked against the rendering mode.
pub async fn classify_route(
    ctx: &RemixContext,
    introspector: &dyn ModuleIntrospector,
    route: &Route,
) -> Result<Vec<String>> {
    let exports = introspector.exports(&ctx.route_file(route)).await?;
    validate_route_exports(route, &exports, ctx.options.is_spa_mode())?;
    Ok(exports)
}

pub(crate) fn route_exports<'a>(exports: &'a RouteExportSet, route: &Route) -> Result<&'a [String]> {
    exports
        .get(&route.id)
        .map(Vec::as_slice)
        .ok_or_else(|| Error::MissingRouteExports(route.id.clone()))
}

/// `base` and `path` joined with exactly one slash between them.
pub(crate) fn combine_urls(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
