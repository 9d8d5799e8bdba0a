//! Rolldown plugin adapter
//!
//! Every hook clones the shared [`RemixPipeline`] into its future and forwards
//! to the matching operation. Plugin errors become `anyhow` errors naming the
//! module id.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fob_plugin_remix::{
//!     BuildMode, BuildTarget, ContextHandle, ContextLoader, FobRemixPlugin, OxcIntrospector,
//!     RemixPipeline, StaticRouteSource,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = ContextLoader::new(".", Arc::new(StaticRouteSource::default()));
//! let context = Arc::new(ContextHandle::new(loader.load().await?));
//! let pipeline = RemixPipeline::new(
//!     context,
//!     Arc::new(OxcIntrospector::new()),
//!     BuildTarget::Client,
//!     BuildMode::Production,
//! );
//! let plugin = Arc::new(FobRemixPlugin::new(Arc::new(pipeline)));
//! # Ok(())
//! # }
//! ```

use crate::pipeline::RemixPipeline;
use anyhow::Context;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage,
    Plugin, PluginContext, SharedTransformPluginContext,
};
use std::borrow::Cow;
use std::sync::Arc;

/// Rolldown plugin serving the Remix virtual modules and route variants.
#[derive(Debug, Clone)]
pub struct FobRemixPlugin {
    pipeline: Arc<RemixPipeline>,
}

impl FobRemixPlugin {
    pub fn new(pipeline: Arc<RemixPipeline>) -> Self {
        Self { pipeline }
    }

    /// The pipeline behind the hooks, shared with the dev controller.
    pub fn pipeline(&self) -> &Arc<RemixPipeline> {
        &self.pipeline
    }
}

impl Plugin for FobRemixPlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-remix".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load | HookUsage::Transform
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let importer = args.importer.map(|s| s.to_string());
        let pipeline = Arc::clone(&self.pipeline);

        async move {
            let resolved = pipeline
                .resolve(&specifier, importer.as_deref())
                .await
                .with_context(|| format!("Failed to resolve '{}'", specifier))?;

            Ok(resolved.map(|id| HookResolveIdOutput {
                id: id.into(),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let pipeline = Arc::clone(&self.pipeline);

        async move {
            let code = pipeline
                .load(&id)
                .await
                .with_context(|| format!("Failed to load {}", id.trim_start_matches('\0')))?;

            Ok(code.map(|code| HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let id = args.id.to_string();
        let code = args.code.to_string();
        let pipeline = Arc::clone(&self.pipeline);

        async move {
            let transformed = pipeline
                .transform(&code, &id)
                .await
                .with_context(|| format!("Failed to transform {}", id))?;

            Ok(transformed.map(|code| HookTransformOutput {
                code: Some(code),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}
