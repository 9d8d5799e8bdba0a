//! The closed set of modules the plugin synthesizes.
//!
//! Ids are plain strings the bundler can cache: resolving one never touches
//! the filesystem. Resolved ids carry a `\0` prefix so other plugins leave
//! them alone, and the dev server exposes them under `/@id/__x00__`.

const ID_PREFIX: &str = "virtual:remix/";
const RESOLVED_PREFIX: &str = "\0";
const DEV_URL_PREFIX: &str = "/@id/__x00__";

/// A module whose content is generated rather than read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualModule {
    /// Generated server entry
    ServerBuild,
    /// `export default <manifest>`
    ServerManifest,
    /// Assigns the dev manifest to `window.__remixManifest`
    BrowserManifest,
    /// React Refresh runtime as an ES module
    HmrRuntime,
    /// Installs the refresh runtime onto `window`
    HmrInjector,
}

impl VirtualModule {
    pub const ALL: [VirtualModule; 5] = [
        VirtualModule::ServerBuild,
        VirtualModule::ServerManifest,
        VirtualModule::BrowserManifest,
        VirtualModule::HmrRuntime,
        VirtualModule::HmrInjector,
    ];

    /// Modules whose content is derived from the plugin context.
    ///
    /// These are the ones invalidated when the context changes.
    pub const CONTEXT_DERIVED: [VirtualModule; 3] = [
        VirtualModule::ServerBuild,
        VirtualModule::ServerManifest,
        VirtualModule::BrowserManifest,
    ];

    /// Short name, e.g. `server-build`.
    pub const fn name(self) -> &'static str {
        match self {
            VirtualModule::ServerBuild => "server-build",
            VirtualModule::ServerManifest => "server-manifest",
            VirtualModule::BrowserManifest => "browser-manifest",
            VirtualModule::HmrRuntime => "hmr-runtime",
            VirtualModule::HmrInjector => "inject-hmr-runtime",
        }
    }

    /// Id used in import specifiers, e.g. `virtual:remix/server-build`.
    pub const fn id(self) -> &'static str {
        match self {
            VirtualModule::ServerBuild => "virtual:remix/server-build",
            VirtualModule::ServerManifest => "virtual:remix/server-manifest",
            VirtualModule::BrowserManifest => "virtual:remix/browser-manifest",
            VirtualModule::HmrRuntime => "virtual:remix/hmr-runtime",
            VirtualModule::HmrInjector => "virtual:remix/inject-hmr-runtime",
        }
    }

    /// Id after resolution.
    pub fn resolved_id(self) -> String {
        format!("{}{}", RESOLVED_PREFIX, self.id())
    }

    /// URL the dev server serves the module from.
    pub fn url(self) -> String {
        format!("{}{}", DEV_URL_PREFIX, self.id())
    }

    /// Look a module up by short name.
    pub fn declare(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|module| module.name() == name)
    }

    /// Resolve an import specifier. Only exact ids match.
    pub fn resolve(specifier: &str) -> Option<Self> {
        if !specifier.starts_with(ID_PREFIX) {
            return None;
        }
        Self::ALL.into_iter().find(|module| module.id() == specifier)
    }

    /// Identify a resolved id handed back by the bundler in `load`.
    pub fn from_resolved_id(id: &str) -> Option<Self> {
        id.strip_prefix(RESOLVED_PREFIX).and_then(Self::resolve)
    }

    /// Only served by the development server.
    pub fn is_dev_only(self) -> bool {
        matches!(
            self,
            VirtualModule::BrowserManifest | VirtualModule::HmrRuntime | VirtualModule::HmrInjector
        )
    }
}

impl std::fmt::Display for VirtualModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
