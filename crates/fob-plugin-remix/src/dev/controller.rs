use super::hmr::{HmrChannel, HmrEvent};
use super::{FsEvent, FsEventKind, ModuleGraph};
use crate::context::{ContextLoader, RemixContext};
use crate::error::Result;
use crate::manifest::{RouteManifestEntry, route_metadata};
use crate::pipeline::RemixPipeline;
use crate::virtual_module::VirtualModule;
use parking_lot::RwLock;
use path_clean::PathClean;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// The cached context reflects the filesystem
    Stable,
    /// A fresh context is being resolved
    Recomputing,
}

/// What handling one filesystem event did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub recomputed: bool,
    pub invalidated: bool,
    pub hmr_sent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Ignore,
    Update,
    Recompute,
}

/// Keeps the plugin context consistent with the filesystem during
/// development.
pub struct DevController {
    loader: ContextLoader,
    pipeline: Arc<RemixPipeline>,
    graph: Arc<dyn ModuleGraph>,
    hmr: Arc<dyn HmrChannel>,
    state: RwLock<ControllerState>,
}

/// Resets the controller to `Stable` however the recompute ends.
struct RecomputeGuard<'a>(&'a RwLock<ControllerState>);

impl<'a> RecomputeGuard<'a> {
    fn enter(state: &'a RwLock<ControllerState>) -> Self {
        *state.write() = ControllerState::Recomputing;
        Self(state)
    }
}

impl Drop for RecomputeGuard<'_> {
    fn drop(&mut self) {
        *self.0.write() = ControllerState::Stable;
    }
}

impl DevController {
    pub fn new(
        loader: ContextLoader,
        pipeline: Arc<RemixPipeline>,
        graph: Arc<dyn ModuleGraph>,
        hmr: Arc<dyn HmrChannel>,
    ) -> Self {
        Self {
            loader,
            pipeline,
            graph,
            hmr,
            state: RwLock::new(ControllerState::Stable),
        }
    }

    pub fn state(&self) -> ControllerState {
        *self.state.read()
    }

    /// Process events until the channel closes, one at a time.
    ///
    /// A failing event is logged and leaves the previous context in place.
    pub async fn run(&self, mut events: mpsc::Receiver<FsEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(&event).await {
                tracing::error!(
                    path = %event.path.display(),
                    error = %e,
                    "failed to process file change"
                );
            }
        }
    }

    /// Handle one filesystem event.
    pub async fn handle(&self, event: &FsEvent) -> Result<UpdateOutcome> {
        let path = event.path.clean();
        let previous = self.pipeline.context().current();

        let mut outcome = UpdateOutcome::default();
        match trigger(&previous, event.kind, &path) {
            Trigger::Ignore => return Ok(outcome),
            Trigger::Update => {}
            Trigger::Recompute => {
                let next = {
                    let _guard = RecomputeGuard::enter(&self.state);
                    self.loader.load().await?
                };
                let equivalent = previous.is_equivalent(&next)?;
                self.pipeline.context().replace(next);
                outcome.recomputed = true;

                tracing::info!(
                    path = %path.display(),
                    changed = !equivalent,
                    "recomputed plugin context"
                );
                if !equivalent {
                    self.invalidate_virtual_modules();
                    outcome.invalidated = true;
                }
            }
        }

        let ctx = self.pipeline.context().current();
        let route = match ctx.route_for_file(&path) {
            Some(route) if event.kind != FsEventKind::Unlink => Some(
                route_metadata(&ctx, self.pipeline.introspector().as_ref(), route).await?,
            ),
            _ => None,
        };

        if let Some(entry) = &route {
            if !outcome.invalidated && self.capabilities_changed(entry) {
                tracing::debug!(route = %entry.id, "route capabilities changed");
                self.invalidate_virtual_modules();
                outcome.invalidated = true;
            }
        }

        self.hmr.send(HmrEvent { route });
        outcome.hmr_sent = true;
        Ok(outcome)
    }

    /// Whether `entry` disagrees with what the browser was last told.
    fn capabilities_changed(&self, entry: &RouteManifestEntry) -> bool {
        let Some(manifest) = self.pipeline.last_dev_manifest() else {
            return false;
        };
        match manifest.routes.get(&entry.id) {
            Some(previous) => previous.capabilities() != entry.capabilities(),
            None => true,
        }
    }

    fn invalidate_virtual_modules(&self) {
        for module in VirtualModule::CONTEXT_DERIVED {
            self.graph.invalidate(&module.resolved_id());
        }
    }
}

impl std::fmt::Debug for DevController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevController")
            .field("loader", &self.loader)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn trigger(ctx: &RemixContext, kind: FsEventKind, path: &Path) -> Trigger {
    let in_app = path.starts_with(ctx.app_directory());
    let is_config = ctx.config_file.as_deref().is_some_and(|file| file == path);

    match kind {
        FsEventKind::Add | FsEventKind::Unlink if in_app => Trigger::Recompute,
        FsEventKind::Change if is_config => Trigger::Recompute,
        _ if in_app => Trigger::Update,
        _ => Trigger::Ignore,
    }
}
