//! Resolve, load and transform as plain async operations.
//!
//! [`RemixPipeline`] holds everything the hooks need and nothing
//! bundler-specific, so tests drive it directly and the Rolldown adapter in
//! [`crate::plugin`] stays a thin wrapper.

use crate::context::{ContextHandle, RemixContext};
use crate::error::{Error, Result};
use crate::exports::policy::{
    check_client_import, client_only_stub, client_route_module, validate_route_exports,
};
use crate::exports::{ModuleIntrospector, SERVER_ONLY_ROUTE_EXPORTS, lexer, strip};
use crate::manifest::{
    BuildManifest, synthesize_development_manifest, synthesize_production_manifest,
    synthesize_server_entry_source,
};
use crate::refresh;
use crate::route::{RouteFileRef, RouteVariant, is_client_only_module, strip_query};
use crate::virtual_module::VirtualModule;
use parking_lot::RwLock;
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Which module graph the pipeline serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    /// Browser bundle; server-only code must not reach it
    Client,
    /// Server bundle; `.client` modules are stubbed
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    Production,
}

/// The plugin's hook logic for one build or dev session.
pub struct RemixPipeline {
    context: Arc<ContextHandle>,
    introspector: Arc<dyn ModuleIntrospector>,
    target: BuildTarget,
    mode: BuildMode,
    production_manifest: OnceCell<Arc<BuildManifest>>,
    last_dev_manifest: RwLock<Option<Arc<BuildManifest>>>,
}

impl RemixPipeline {
    pub fn new(
        context: Arc<ContextHandle>,
        introspector: Arc<dyn ModuleIntrospector>,
        target: BuildTarget,
        mode: BuildMode,
    ) -> Self {
        Self {
            context,
            introspector,
            target,
            mode,
            production_manifest: OnceCell::new(),
            last_dev_manifest: RwLock::new(None),
        }
    }

    pub fn context(&self) -> &Arc<ContextHandle> {
        &self.context
    }

    pub fn introspector(&self) -> &Arc<dyn ModuleIntrospector> {
        &self.introspector
    }

    pub fn target(&self) -> BuildTarget {
        self.target
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    fn is_development(&self) -> bool {
        self.mode == BuildMode::Development
    }

    /// The most recent development manifest handed to a client.
    pub fn last_dev_manifest(&self) -> Option<Arc<BuildManifest>> {
        self.last_dev_manifest.read().clone()
    }

    /// Client build inputs for the current context.
    pub fn client_build_inputs(&self) -> Vec<String> {
        self.context.current().client_build_inputs()
    }

    /// End the session; the introspector refuses further work.
    pub async fn close(&self) -> Result<()> {
        self.introspector.close().await
    }

    /// Resolve `specifier` when it names something this plugin owns.
    ///
    /// On the client target every specifier also passes the server-only
    /// import check, including ones another resolver will handle.
    pub async fn resolve(&self, specifier: &str, importer: Option<&str>) -> Result<Option<String>> {
        if let Some(module) = VirtualModule::resolve(specifier) {
            return Ok(Some(module.resolved_id()));
        }

        let ctx = self.context.current();
        if self.target == BuildTarget::Client {
            let resolved = relative_target(specifier, importer);
            check_client_import(
                &ctx,
                specifier,
                resolved.as_deref().and_then(Path::to_str),
                importer,
            )?;
        }

        let file_ref = RouteFileRef::parse(specifier);
        if file_ref.variant != RouteVariant::ClientOnly {
            return Ok(None);
        }

        let path = if file_ref.path.is_absolute() {
            file_ref.path.clean()
        } else {
            match relative_target(&file_ref.path.to_string_lossy(), importer) {
                Some(path) => path,
                None => ctx.root_directory.join(&file_ref.path).clean(),
            }
        };
        Ok(Some(RouteFileRef::client_only(path).to_id()))
    }

    /// Content of a virtual module or of a client-only route variant.
    pub async fn load(&self, id: &str) -> Result<Option<String>> {
        if let Some(module) = VirtualModule::from_resolved_id(id) {
            return self.load_virtual(module).await.map(Some);
        }
        if id.starts_with("\0virtual:remix/") {
            return Err(Error::UnknownVirtualModule(id.trim_start_matches('\0').to_string()));
        }

        let file_ref = RouteFileRef::parse(id);
        if file_ref.variant != RouteVariant::ClientOnly {
            return Ok(None);
        }

        let ctx = self.context.current();
        let exports = self.introspector.exports(&file_ref.path).await?;
        if let Some(route) = ctx.route_for_file(&file_ref.path) {
            validate_route_exports(route, &exports, ctx.options.is_spa_mode())?;
        }
        let file_name = file_ref
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::UnresolvableModule(file_ref.path.clone()))?;

        tracing::debug!(id, "loaded client route module");
        Ok(Some(client_route_module(&file_name, &exports)))
    }

    async fn load_virtual(&self, module: VirtualModule) -> Result<String> {
        let ctx = self.context.current();
        match module {
            VirtualModule::ServerBuild => synthesize_server_entry_source(&ctx),
            VirtualModule::ServerManifest => self.server_manifest(&ctx).await?.to_server_module(),
            VirtualModule::BrowserManifest => {
                if !self.is_development() {
                    return Err(Error::BrowserManifestInBuild);
                }
                self.development_manifest(&ctx).await?.to_browser_script()
            }
            VirtualModule::HmrRuntime => refresh::hmr_runtime_module(&ctx.root_directory).await,
            VirtualModule::HmrInjector => Ok(refresh::hmr_injector_module()),
        }
    }

    async fn server_manifest(&self, ctx: &RemixContext) -> Result<Arc<BuildManifest>> {
        if self.is_development() {
            return self.development_manifest(ctx).await;
        }
        self.production_manifest
            .get_or_try_init(|| async {
                let written = synthesize_production_manifest(ctx, self.introspector.as_ref()).await?;
                Ok::<_, Error>(Arc::new(written.manifest))
            })
            .await
            .cloned()
    }

    async fn development_manifest(&self, ctx: &RemixContext) -> Result<Arc<BuildManifest>> {
        let manifest = Arc::new(synthesize_development_manifest(ctx, self.introspector.as_ref()).await?);
        *self.last_dev_manifest.write() = Some(Arc::clone(&manifest));
        Ok(manifest)
    }

    /// Rewrite module code for the current target.
    ///
    /// Server builds stub out `.client` modules. Client builds strip
    /// server-only exports from route modules, and in development wrap them
    /// for fast refresh. `None` leaves the code untouched.
    pub async fn transform(&self, code: &str, id: &str) -> Result<Option<String>> {
        if id.starts_with('\0') {
            return Ok(None);
        }
        let path = Path::new(strip_query(id));

        match self.target {
            BuildTarget::Server => {
                if !is_client_only_module(id) {
                    return Ok(None);
                }
                let exports = lexer::export_names(code, path)?;
                tracing::debug!(id, exports = exports.len(), "stubbed client-only module");
                Ok(Some(client_only_stub(&exports)))
            }
            BuildTarget::Client => {
                if RouteFileRef::parse(id).variant != RouteVariant::Full {
                    return Ok(None);
                }
                let ctx = self.context.current();
                let Some(route) = ctx.route_for_file(path) else {
                    return Ok(None);
                };

                let exports = lexer::export_names(code, path)?;
                validate_route_exports(route, &exports, ctx.options.is_spa_mode())?;
                let stripped = strip::remove_exports(code, path, SERVER_ONLY_ROUTE_EXPORTS)?;

                if self.is_development() {
                    return refresh::wrap_route_module(&stripped, id, &route.id).map(Some);
                }
                Ok((stripped != code).then_some(stripped))
            }
        }
    }
}

impl std::fmt::Debug for RemixPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemixPipeline")
            .field("target", &self.target)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Where a relative specifier points, given its importer.
fn relative_target(specifier: &str, importer: Option<&str>) -> Option<PathBuf> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    let importer = Path::new(strip_query(importer?));
    Some(importer.parent()?.join(specifier).clean())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemixPluginOptions;
    use crate::exports::StaticIntrospector;
    use crate::route::{CLIENT_ROUTE_QUERY, Route, RouteManifest};

    fn context(ssr: bool) -> RemixContext {
        RemixContext {
            root_directory: PathBuf::from("/p"),
            options: RemixPluginOptions {
                ssr,
                ..Default::default()
            },
            routes: RouteManifest::new([
                Route::new("root", "root.tsx"),
                Route::new("routes/about", "routes/about.tsx")
                    .with_parent("root")
                    .with_path("about"),
            ]),
            entry_client_file: PathBuf::from("/p/app/entry.client.tsx"),
            entry_server_file: PathBuf::from("/p/app/entry.server.tsx"),
            config_file: None,
        }
    }

    fn pipeline(target: BuildTarget, mode: BuildMode, ssr: bool) -> RemixPipeline {
        let introspector = StaticIntrospector::new()
            .with_exports("/p/app/root.tsx", &["default", "links"])
            .with_exports("/p/app/routes/about.tsx", &["loader", "default", "meta"]);
        RemixPipeline::new(
            Arc::new(ContextHandle::new(context(ssr))),
            Arc::new(introspector),
            target,
            mode,
        )
    }

    #[tokio::test]
    async fn test_resolves_virtual_ids_only() {
        let p = pipeline(BuildTarget::Server, BuildMode::Production, true);
        assert_eq!(
            p.resolve("virtual:remix/server-build", None).await.unwrap(),
            Some("\0virtual:remix/server-build".to_string())
        );
        assert_eq!(p.resolve("virtual:remix/nope", None).await.unwrap(), None);
        assert_eq!(p.resolve("react", Some("/p/app/root.tsx")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolves_client_route_query_against_importer() {
        let p = pipeline(BuildTarget::Client, BuildMode::Production, true);
        let id = p
            .resolve("./routes/about.tsx?client-route=1", Some("/p/app/root.tsx"))
            .await
            .unwrap();
        assert_eq!(id, Some(format!("/p/app/routes/about.tsx{}", CLIENT_ROUTE_QUERY)));
    }

    #[tokio::test]
    async fn test_client_rejects_server_only_import() {
        let p = pipeline(BuildTarget::Client, BuildMode::Production, true);
        let err = p
            .resolve("./db.server", Some("/p/app/routes/about.tsx"))
            .await
            .unwrap_err();
        match err {
            Error::ServerOnlyModuleInClient {
                specifier,
                importer,
                is_route,
            } => {
                assert_eq!(specifier, "./db.server");
                assert_eq!(importer, "app/routes/about.tsx");
                assert!(is_route);
            }
            other => panic!("unexpected error: {other}"),
        }

        let server = pipeline(BuildTarget::Server, BuildMode::Production, true);
        assert!(server.resolve("./db.server", Some("/p/app/routes/about.tsx")).await.is_ok());
    }

    #[tokio::test]
    async fn test_loads_client_route_variant() {
        let p = pipeline(BuildTarget::Client, BuildMode::Production, true);
        let code = p
            .load("/p/app/routes/about.tsx?client-route=1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code, r#"export { default, meta } from "./about.tsx";"#);
        assert_eq!(p.load("/p/app/routes/about.tsx").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_browser_manifest_is_development_only() {
        let prod = pipeline(BuildTarget::Client, BuildMode::Production, true);
        let err = prod
            .load(&VirtualModule::BrowserManifest.resolved_id())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BrowserManifestInBuild));

        let dev = pipeline(BuildTarget::Client, BuildMode::Development, true);
        assert!(dev.last_dev_manifest().is_none());
        let script = dev
            .load(&VirtualModule::BrowserManifest.resolved_id())
            .await
            .unwrap()
            .unwrap();
        assert!(script.starts_with("window.__remixManifest="));
        let manifest = dev.last_dev_manifest().unwrap();
        assert!(manifest.routes["routes/about"].has_loader);
    }

    #[tokio::test]
    async fn test_unknown_virtual_module() {
        let p = pipeline(BuildTarget::Server, BuildMode::Development, true);
        let err = p.load("\0virtual:remix/missing").await.unwrap_err();
        assert!(matches!(err, Error::UnknownVirtualModule(ref id) if id == "virtual:remix/missing"));
    }

    #[tokio::test]
    async fn test_client_transform_strips_loader() {
        let p = pipeline(BuildTarget::Client, BuildMode::Production, true);
        let code = "import { db } from \"./db.server\";\nexport const loader = () => db.get();\nexport default function About() { return null; }\n";
        let out = p.transform(code, "/p/app/routes/about.tsx").await.unwrap().unwrap();
        assert!(!out.contains("loader"));
        assert!(!out.contains("db.server"));
        assert!(out.contains("export default function About()"));

        assert_eq!(p.transform(code, "/p/app/components/x.tsx").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_client_transform_rejects_loader_in_spa_mode() {
        let p = pipeline(BuildTarget::Client, BuildMode::Production, false);
        let code = "export const loader = () => null;\nexport default function About() {}\n";
        let err = p.transform(code, "/p/app/routes/about.tsx").await.unwrap_err();
        assert!(matches!(err, Error::SpaModeServerExports { .. }));
    }

    #[tokio::test]
    async fn test_development_transform_adds_refresh() {
        let p = pipeline(BuildTarget::Client, BuildMode::Development, true);
        let out = p
            .transform("export default function Root() {}\n", "/p/app/root.tsx")
            .await
            .unwrap()
            .unwrap();
        assert!(out.contains("RefreshRuntime.register"));
        assert!(out.contains(r#"__remixRouteModuleUpdates.set("root""#));
    }

    #[tokio::test]
    async fn test_server_transform_stubs_client_modules() {
        let p = pipeline(BuildTarget::Server, BuildMode::Production, true);
        let out = p
            .transform(
                "export const track = () => window.analytics();\nexport default {};\n",
                "/p/app/utils/analytics.client.ts",
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, "export const track = undefined;\nexport default undefined;");
        assert_eq!(
            p.transform("export const x = 1;", "/p/app/utils/format.ts").await.unwrap(),
            None
        );
    }
}
