//! Plugin options with multi-source loading.
//!
//! Merges settings from programmatic overrides, environment variables and
//! `remix.config.json`. Priority: overrides > environment > file > defaults

mod defaults;
mod loading;
mod validation;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub use defaults::*;
pub use loading::CONFIG_FILE_NAME;

/// Remix plugin options - loaded from remix.config.json or built in code.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RemixPluginOptions {
    /// Directory holding root.tsx, the entry files and the routes
    #[serde(default = "default_app_directory")]
    pub app_directory: PathBuf,

    /// Output directory; the client build lands in `<dir>/client`, the server in `<dir>/server`
    #[serde(default = "default_build_directory")]
    pub build_directory: PathBuf,

    /// File name of the server build inside `<buildDirectory>/server`
    #[serde(default = "default_server_build_file")]
    pub server_build_file: String,

    /// URL prefix for every emitted asset (must end with `/`)
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Assets directory inside the client build
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// Router basename (must start with `/`)
    #[serde(default = "default_basename")]
    pub basename: String,

    /// Server-side rendering; `false` builds a static SPA
    #[serde(default = "default_ssr")]
    pub ssr: bool,

    /// Also write `<buildDirectory>/.vite/remix-manifest.json` describing routes and server bundles
    #[serde(default)]
    pub manifest: bool,

    /// Future flags forwarded to the server build
    #[serde(default)]
    pub future: FutureFlags,

    /// Splits the server build per route branch. Not serializable, so it never
    /// takes part in context comparison.
    #[serde(skip)]
    #[schemars(skip)]
    pub server_bundles: Option<ServerBundles>,
}

/// Future flags exported from the server build as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FutureFlags {
    #[serde(default, rename = "v3_fetcherPersist")]
    pub v3_fetcher_persist: bool,

    #[serde(default, rename = "v3_relativeSplatPath")]
    pub v3_relative_splat_path: bool,

    #[serde(default, rename = "v3_throwAbortReason")]
    pub v3_throw_abort_reason: bool,

    #[serde(default, rename = "unstable_singleFetch")]
    pub unstable_single_fetch: bool,
}

/// Callback assigning a route branch (root first) to a named server bundle.
#[derive(Clone)]
pub struct ServerBundles(pub Arc<dyn Fn(&[crate::route::Route]) -> String + Send + Sync>);

impl std::fmt::Debug for ServerBundles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServerBundles(..)")
    }
}

impl Default for RemixPluginOptions {
    fn default() -> Self {
        Self {
            app_directory: default_app_directory(),
            build_directory: default_build_directory(),
            server_build_file: default_server_build_file(),
            public_path: default_public_path(),
            assets_dir: default_assets_dir(),
            basename: default_basename(),
            ssr: default_ssr(),
            manifest: false,
            future: FutureFlags::default(),
            server_bundles: None,
        }
    }
}

impl RemixPluginOptions {
    /// Whether the app is built as a static SPA with no server at runtime.
    pub fn is_spa_mode(&self) -> bool {
        !self.ssr
    }

    /// Generate JSON Schema for remix.config.json.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(RemixPluginOptions);
        serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
    }
}
