//! Remix support for the Rolldown bundler.
//!
//! The plugin serves a fixed set of virtual modules (server entry, server and
//! browser manifests, refresh runtime), splits route modules into client and
//! server halves, and derives the browser manifest from the client build's
//! chunk manifest.
//!
//! ## Architecture
//!
//! ```text
//! ContextLoader ─→ RemixContext ─→ ContextHandle (pointer swap)
//!                                      │
//!            ModuleIntrospector ──→ RemixPipeline ──→ FobRemixPlugin (Rolldown hooks)
//!                                      │
//!            FsEvent ─→ DevController ─┘─→ ModuleGraph::invalidate / HmrChannel
//! ```
//!
//! Everything below the Rolldown adapter is plain async Rust, so hosts and
//! tests can call [`RemixPipeline::resolve`], [`RemixPipeline::load`] and
//! [`RemixPipeline::transform`] directly.
//!
//! ## Logging
//!
//! The crate only emits `tracing` events. Enable the `logging` feature for
//! [`init_logging`] helpers that install a subscriber.

pub mod assets;
pub mod config;
pub mod context;
pub mod dev;
pub mod error;
pub mod exports;
pub mod manifest;
pub mod pipeline;
pub mod plugin;
pub mod refresh;
pub mod route;
pub mod virtual_module;

#[cfg(feature = "logging")]
pub mod logging;

pub use assets::{BuildAssets, BundlerManifest, ManifestChunk};
pub use config::{FutureFlags, RemixPluginOptions, ServerBundles};
pub use context::{ContextHandle, ContextLoader, RemixContext, RouteSource, StaticRouteSource};
pub use dev::{
    BroadcastHmrChannel, DevController, FileWatcher, FsEvent, FsEventKind, HmrChannel, HmrEvent,
    ModuleGraph,
};
pub use error::{Error, Result};
pub use exports::{ModuleIntrospector, OxcIntrospector, StaticIntrospector};
pub use manifest::{
    BuildManifest, ProductionManifest, RouteManifestEntry, route_metadata,
    synthesize_development_manifest, synthesize_production_manifest,
    synthesize_server_entry_source,
};
pub use pipeline::{BuildMode, BuildTarget, RemixPipeline};
pub use plugin::FobRemixPlugin;
pub use route::{Route, RouteFileRef, RouteManifest, RouteVariant};
pub use virtual_module::VirtualModule;

#[cfg(feature = "logging")]
pub use logging::{LogLevel, init_logging, init_logging_from_env};
