use super::{BuildManifest, HmrInfo, RouteManifestEntry, classify_route, classify_routes, combine_urls, route_exports};
use crate::assets::BuildAssets;
use crate::context::RemixContext;
use crate::error::Result;
use crate::exports::ModuleIntrospector;
use crate::route::Route;
use crate::virtual_module::VirtualModule;
use indexmap::IndexMap;

/// Query that makes the dev server answer with a JS module for any file.
pub const IMPORT_QUERY: &str = "?import";

/// Manifest pointing at source files served by the dev server.
///
/// Imports are left empty because the browser resolves them itself. The
/// version is random so every call forces a refetch. Nothing is written.
pub async fn synthesize_development_manifest(
    ctx: &RemixContext,
    introspector: &dyn ModuleIntrospector,
) -> Result<BuildManifest> {
    let exports = classify_routes(ctx, introspector).await?;

    let mut routes = IndexMap::with_capacity(ctx.routes.len());
    for route in ctx.routes.iter() {
        let entry = route_entry(ctx, route, route_exports(&exports, route)?);
        routes.insert(route.id.clone(), entry);
    }

    let public_path = &ctx.options.public_path;
    Ok(BuildManifest {
        entry: BuildAssets {
            module: combine_urls(public_path, &ctx.file_url(&ctx.entry_client_file)),
            imports: Vec::new(),
            css: Vec::new(),
        },
        routes,
        version: uuid::Uuid::new_v4().to_string(),
        url: combine_urls(public_path, &VirtualModule::BrowserManifest.url()),
        hmr: Some(HmrInfo {
            runtime: combine_urls(public_path, &VirtualModule::HmrInjector.url()),
        }),
    })
}

/// Fresh metadata for a single route, as sent with hot updates.
pub async fn route_metadata(
    ctx: &RemixContext,
    introspector: &dyn ModuleIntrospector,
    route: &Route,
) -> Result<RouteManifestEntry> {
    let exports = classify_route(ctx, introspector, route).await?;
    Ok(route_entry(ctx, route, &exports))
}

fn route_entry(ctx: &RemixContext, route: &Route, exports: &[String]) -> RouteManifestEntry {
    let module = format!(
        "{}{}",
        combine_urls(&ctx.options.public_path, &ctx.file_url(&ctx.route_file(route))),
        IMPORT_QUERY
    );
    RouteManifestEntry::new(
        route,
        exports,
        BuildAssets {
            module,
            imports: Vec::new(),
            css: Vec::new(),
        },
    )
}
