//! Error types for the Remix plugin.
//!
//! Every variant is fatal for the operation that produced it. Errors fall into
//! four groups:
//!
//! - **Configuration**: missing config files, invalid or conflicting options
//! - **Resolution**: unknown virtual modules, bundler manifest entries that
//!   should exist but don't
//! - **Boundary violations**: server-only code reaching the client graph,
//!   exports that are not allowed under the current rendering mode
//! - **Compilation**: route modules the parser cannot read
//!
//! Hooks convert these into `anyhow::Error` at the Rolldown boundary; library
//! callers get the structured variants and a `miette::Diagnostic` rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Remix plugin.
#[derive(Debug, Error)]
pub enum Error {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Configuration failed to load or validate.
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// Two options were combined that cannot be used together.
    #[error("Conflicting options: {0}")]
    ConflictingOptions(String),

    /// A required entry file is missing from the app directory.
    #[error("Missing {kind} entry file in {} (looked for {})", .app_directory.display(), .candidates.join(", "))]
    MissingEntry {
        kind: &'static str,
        app_directory: PathBuf,
        candidates: Vec<String>,
    },

    /// A virtual module id was requested that the plugin never declared.
    #[error("Unknown virtual module: {0}")]
    UnknownVirtualModule(String),

    /// The bundler manifest has no entry for a file that was a bundler input.
    #[error("No manifest entry found for \"{key}\". Known manifest keys: {}", format_known_keys(.known_keys))]
    ManifestEntryNotFound { key: String, known_keys: Vec<String> },

    /// A route module could not be located before transformation.
    #[error("Could not resolve module: {}", .0.display())]
    UnresolvableModule(PathBuf),

    /// The introspector was used after its session ended.
    #[error("Module introspector used after close: {}", .0.display())]
    IntrospectorClosed(PathBuf),

    /// Exports were requested for a route that was never classified.
    #[error("Missing export classification for route '{0}'")]
    MissingRouteExports(String),

    /// A server-only module was imported from the client module graph.
    #[error("Server-only module referenced by client\n\n    '{specifier}' imported by {}'{importer}'\n", route_label(.is_route))]
    ServerOnlyModuleInClient {
        specifier: String,
        importer: String,
        is_route: bool,
    },

    /// A route exports server-only functions while SSR is disabled.
    #[error("SPA Mode: {} invalid route export(s) in `{file}`: {}", .exports.len(), format_export_list(.exports))]
    SpaModeServerExports { file: String, exports: Vec<String> },

    /// A non-root route exports `HydrateFallback` while SSR is disabled.
    #[error("SPA Mode: Invalid `HydrateFallback` export found in `{file}`. `HydrateFallback` is only permitted on the root route in SPA Mode.")]
    SpaModeHydrateFallback { file: String },

    /// The browser manifest module only exists on the development server.
    #[error("The browser manifest module is only available in development")]
    BrowserManifestInBuild,

    /// The parser rejected a module.
    #[error("Failed to compile {}: {}", .file.display(), .diagnostics.join("; "))]
    Compilation {
        file: PathBuf,
        diagnostics: Vec<String>,
    },

    /// I/O error with the path that caused it.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The filesystem watcher could not be started.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for policy violations between the client and server graphs.
    pub fn is_boundary_violation(&self) -> bool {
        matches!(
            self,
            Error::ServerOnlyModuleInClient { .. }
                | Error::SpaModeServerExports { .. }
                | Error::SpaModeHydrateFallback { .. }
                | Error::BrowserManifestInBuild
        )
    }
}

fn route_label(is_route: &bool) -> &'static str {
    if *is_route { "route " } else { "" }
}

fn format_known_keys(keys: &[String]) -> String {
    keys.iter()
        .map(|key| format!("\"{}\"", key))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_export_list(exports: &[String]) -> String {
    exports
        .iter()
        .map(|name| format!("`{}`", name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::ConfigNotFound(_) => "REMIX_CONFIG_NOT_FOUND",
            Error::InvalidConfig { .. } => "REMIX_INVALID_CONFIG",
            Error::ConflictingOptions(_) => "REMIX_CONFLICTING_OPTIONS",
            Error::MissingEntry { .. } => "REMIX_MISSING_ENTRY",
            Error::UnknownVirtualModule(_) => "REMIX_UNKNOWN_VIRTUAL_MODULE",
            Error::ManifestEntryNotFound { .. } => "REMIX_MANIFEST_ENTRY_NOT_FOUND",
            Error::UnresolvableModule(_) => "REMIX_UNRESOLVABLE_MODULE",
            Error::IntrospectorClosed(_) => "REMIX_INTROSPECTOR_CLOSED",
            Error::MissingRouteExports(_) => "REMIX_MISSING_ROUTE_EXPORTS",
            Error::ServerOnlyModuleInClient { .. } => "REMIX_SERVER_ONLY_MODULE",
            Error::SpaModeServerExports { .. } => "REMIX_SPA_SERVER_EXPORTS",
            Error::SpaModeHydrateFallback { .. } => "REMIX_SPA_HYDRATE_FALLBACK",
            Error::BrowserManifestInBuild => "REMIX_BROWSER_MANIFEST_IN_BUILD",
            Error::Compilation { .. } => "REMIX_COMPILATION_ERROR",
            Error::Io { .. } => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Watch(_) => "REMIX_WATCH_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::ConfigNotFound(path) => Some(Box::new(format!(
                "Create {} or drop the explicit config path to use the defaults.",
                path.display()
            ))),
            Error::InvalidConfig { .. } | Error::ConflictingOptions(_) => Some(Box::new(
                "Check remix.config.json and REMIX_* environment variables.",
            )),
            Error::ManifestEntryNotFound { .. } => Some(Box::new(
                "Every route file must be a client build input. Make sure the client build ran with the entries from `client_build_inputs` and emitted .vite/manifest.json.",
            )),
            Error::ServerOnlyModuleInClient { is_route: true, .. } => Some(Box::new(
                "Remix automatically removes server code from these exports: `loader`, `action`, `headers`.\nBut other route exports depend on this module. See https://remix.run/docs/en/main/guides/vite#splitting-up-client-and-server-code",
            )),
            Error::ServerOnlyModuleInClient { .. } => Some(Box::new(
                "See https://remix.run/docs/en/main/guides/vite#splitting-up-client-and-server-code",
            )),
            Error::SpaModeServerExports { .. } | Error::SpaModeHydrateFallback { .. } => {
                Some(Box::new(
                    "See https://remix.run/guides/spa-mode for more information.",
                ))
            }
            _ => None,
        }
    }
}
