//! Plugin context: resolved options, route manifest and entry files.
//!
//! A [`RemixContext`] is immutable. [`ContextLoader::load`] builds a fresh one
//! from scratch and [`ContextHandle`] swaps it in as a whole, so readers hold
//! either the previous or the next context and never a mix of both.

use crate::config::{RemixPluginOptions, ServerBundles};
use crate::error::{Error, Result};
use crate::route::{CLIENT_ROUTE_QUERY, Route, RouteManifest};
use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ENTRY_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

/// Produces the route manifest for an app directory.
#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn routes(&self, app_directory: &Path) -> Result<RouteManifest>;
}

/// Route source returning a fixed manifest that can be swapped between loads.
#[derive(Debug, Default)]
pub struct StaticRouteSource {
    routes: RwLock<RouteManifest>,
}

impl StaticRouteSource {
    pub fn new(routes: RouteManifest) -> Self {
        Self {
            routes: RwLock::new(routes),
        }
    }

    pub fn set(&self, routes: RouteManifest) {
        *self.routes.write() = routes;
    }
}

#[async_trait]
impl RouteSource for StaticRouteSource {
    async fn routes(&self, _app_directory: &Path) -> Result<RouteManifest> {
        Ok(self.routes.read().clone())
    }
}

/// Everything the synthesizers read, resolved once per (re)computation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixContext {
    pub root_directory: PathBuf,
    pub options: RemixPluginOptions,
    pub routes: RouteManifest,
    pub entry_client_file: PathBuf,
    pub entry_server_file: PathBuf,
    pub config_file: Option<PathBuf>,
}

impl RemixContext {
    /// Absolute app directory.
    pub fn app_directory(&self) -> PathBuf {
        self.root_directory.join(&self.options.app_directory).clean()
    }

    pub fn build_directory(&self) -> PathBuf {
        self.root_directory.join(&self.options.build_directory).clean()
    }

    pub fn client_build_directory(&self) -> PathBuf {
        self.build_directory().join("client")
    }

    pub fn server_build_directory(&self) -> PathBuf {
        self.build_directory().join("server")
    }

    /// Where the client build writes its chunk manifest.
    pub fn bundler_manifest_path(&self) -> PathBuf {
        self.client_build_directory().join(".vite").join("manifest.json")
    }

    pub fn route_file(&self, route: &Route) -> PathBuf {
        self.app_directory().join(&route.file).clean()
    }

    /// The route whose module is `path`, if any.
    pub fn route_for_file(&self, path: &Path) -> Option<&Route> {
        self.routes.find_by_file(&self.app_directory(), &path.clean())
    }

    /// `path` relative to the project root with forward slashes.
    pub fn root_relative(&self, path: &Path) -> String {
        crate::assets::root_relative_path(&self.root_directory, path)
    }

    /// URL the dev server serves `path` from: `/app/root.tsx` inside the
    /// project root, `/@fs/<absolute>` outside it.
    pub fn file_url(&self, path: &Path) -> String {
        let path = path.clean();
        match path.strip_prefix(&self.root_directory) {
            Ok(relative) => format!("/{}", relative.to_string_lossy().replace('\\', "/")),
            Err(_) => {
                let absolute = path.to_string_lossy().replace('\\', "/");
                format!("/@fs/{}", absolute.trim_start_matches('/'))
            }
        }
    }

    /// Inputs for the client build: the client entry plus the client-route
    /// variant of every route module.
    pub fn client_build_inputs(&self) -> Vec<String> {
        std::iter::once(self.entry_client_file.to_string_lossy().into_owned())
            .chain(self.routes.iter().map(|route| {
                format!("{}{}", self.route_file(route).to_string_lossy(), CLIENT_ROUTE_QUERY)
            }))
            .collect()
    }

    /// Structural equality over the JSON form of both contexts.
    ///
    /// Fields that do not serialize, such as the `serverBundles` callback, do
    /// not take part.
    pub fn is_equivalent(&self, other: &RemixContext) -> Result<bool> {
        Ok(serde_json::to_value(self)? == serde_json::to_value(other)?)
    }
}

/// Builds [`RemixContext`]s from config sources and a [`RouteSource`].
#[derive(Clone)]
pub struct ContextLoader {
    root: PathBuf,
    config_path: Option<PathBuf>,
    overrides: Option<serde_json::Value>,
    server_bundles: Option<ServerBundles>,
    route_source: Arc<dyn RouteSource>,
}

impl ContextLoader {
    pub fn new(root: impl Into<PathBuf>, route_source: Arc<dyn RouteSource>) -> Self {
        Self {
            root: root.into(),
            config_path: None,
            overrides: None,
            server_bundles: None,
            route_source,
        }
    }

    /// Use an explicit config file instead of `remix.config.json`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Options set in code, applied over every other source.
    pub fn with_overrides(mut self, overrides: serde_json::Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn with_server_bundles(mut self, server_bundles: ServerBundles) -> Self {
        self.server_bundles = Some(server_bundles);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The config file a change event has to hit to trigger a reload.
    pub fn config_file(&self) -> Result<Option<PathBuf>> {
        RemixPluginOptions::config_file(&self.root, self.config_path.as_deref())
    }

    /// Resolve a brand-new context.
    pub async fn load(&self) -> Result<RemixContext> {
        let config_file = self.config_file()?;
        let mut options =
            RemixPluginOptions::load(&self.root, config_file.as_deref(), self.overrides.as_ref())?;
        if self.server_bundles.is_some() {
            options.server_bundles = self.server_bundles.clone();
            options.validate()?;
        }

        let app_directory = self.root.join(&options.app_directory).clean();
        let entry_client_file = find_entry(&app_directory, "client")?;
        let entry_server_file = find_entry(&app_directory, "server")?;
        let routes = self.route_source.routes(&app_directory).await?;

        tracing::debug!(
            root = %self.root.display(),
            routes = routes.len(),
            "resolved plugin context"
        );

        Ok(RemixContext {
            root_directory: self.root.clean(),
            options,
            routes,
            entry_client_file,
            entry_server_file,
            config_file,
        })
    }
}

impl std::fmt::Debug for ContextLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLoader")
            .field("root", &self.root)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

fn find_entry(app_directory: &Path, kind: &'static str) -> Result<PathBuf> {
    let candidates: Vec<String> = ENTRY_EXTENSIONS
        .iter()
        .map(|ext| format!("entry.{}.{}", kind, ext))
        .collect();

    candidates
        .iter()
        .map(|name| app_directory.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| Error::MissingEntry {
            kind,
            app_directory: app_directory.to_path_buf(),
            candidates,
        })
}

/// Current context behind a single-writer pointer swap.
#[derive(Debug)]
pub struct ContextHandle {
    current: RwLock<Arc<RemixContext>>,
}

impl ContextHandle {
    pub fn new(context: RemixContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(context)),
        }
    }

    /// Snapshot of the current context.
    pub fn current(&self) -> Arc<RemixContext> {
        Arc::clone(&self.current.read())
    }

    /// Swap in `context`, returning the one it replaced.
    pub fn replace(&self, context: RemixContext) -> Arc<RemixContext> {
        std::mem::replace(&mut *self.current.write(), Arc::new(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(app.join("routes")).unwrap();
        fs::write(app.join("entry.client.tsx"), "").unwrap();
        fs::write(app.join("entry.server.tsx"), "").unwrap();
        fs::write(app.join("root.tsx"), "").unwrap();
        dir
    }

    fn routes() -> RouteManifest {
        RouteManifest::new([
            Route::new("root", "root.tsx"),
            Route::new("routes/about", "routes/about.tsx").with_parent("root"),
        ])
    }

    #[tokio::test]
    async fn test_load_context() {
        let dir = project();
        let loader = ContextLoader::new(dir.path(), Arc::new(StaticRouteSource::new(routes())));
        let ctx = loader.load().await.unwrap();

        assert_eq!(ctx.app_directory(), dir.path().join("app"));
        assert_eq!(ctx.entry_client_file, dir.path().join("app/entry.client.tsx"));
        assert_eq!(ctx.routes.len(), 2);
        assert_eq!(
            ctx.bundler_manifest_path(),
            dir.path().join("build/client/.vite/manifest.json")
        );
    }

    #[tokio::test]
    async fn test_missing_entry_lists_candidates() {
        let dir = project();
        fs::remove_file(dir.path().join("app/entry.server.tsx")).unwrap();
        let loader = ContextLoader::new(dir.path(), Arc::new(StaticRouteSource::default()));

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, Error::MissingEntry { kind: "server", .. }));
        assert!(err.to_string().contains("entry.server.tsx, entry.server.ts"));
    }

    #[tokio::test]
    async fn test_equivalence_ignores_server_bundles() {
        let dir = project();
        let source = Arc::new(StaticRouteSource::new(routes()));
        let plain = ContextLoader::new(dir.path(), source.clone()).load().await.unwrap();
        let bundled = ContextLoader::new(dir.path(), source.clone())
            .with_server_bundles(ServerBundles(Arc::new(|_: &[crate::route::Route]| "main".to_string())))
            .load()
            .await
            .unwrap();
        assert!(plain.is_equivalent(&bundled).unwrap());

        source.set(RouteManifest::new([Route::new("root", "root.tsx")]));
        let fewer = ContextLoader::new(dir.path(), source).load().await.unwrap();
        assert!(!plain.is_equivalent(&fewer).unwrap());
    }

    #[tokio::test]
    async fn test_urls_and_inputs() {
        let dir = project();
        let loader = ContextLoader::new(dir.path(), Arc::new(StaticRouteSource::new(routes())));
        let ctx = loader.load().await.unwrap();

        assert_eq!(ctx.file_url(&dir.path().join("app/root.tsx")), "/app/root.tsx");
        assert!(ctx.file_url(Path::new("/elsewhere/lib.ts")).starts_with("/@fs/"));

        let inputs = ctx.client_build_inputs();
        assert_eq!(inputs.len(), 3);
        assert!(inputs[2].ends_with("app/routes/about.tsx?client-route=1"));
        assert_eq!(
            ctx.route_for_file(&dir.path().join("app/routes/about.tsx")).map(|r| r.id.as_str()),
            Some("routes/about")
        );
    }

    #[test]
    fn test_handle_swaps_whole_context() {
        let ctx = RemixContext {
            root_directory: PathBuf::from("/p"),
            options: RemixPluginOptions::default(),
            routes: routes(),
            entry_client_file: PathBuf::from("/p/app/entry.client.tsx"),
            entry_server_file: PathBuf::from("/p/app/entry.server.tsx"),
            config_file: None,
        };
        let handle = ContextHandle::new(ctx.clone());
        let before = handle.current();

        let mut next = ctx;
        next.routes = RouteManifest::default();
        let previous = handle.replace(next);

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.routes.len(), 2);
        assert!(handle.current().routes.is_empty());
    }
}
