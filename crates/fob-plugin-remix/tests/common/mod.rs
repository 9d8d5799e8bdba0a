//! Shared fixtures: a small Remix app on disk and recording dev collaborators.

#![allow(dead_code)]

use fob_plugin_remix::{
    ContextLoader, HmrChannel, HmrEvent, ModuleGraph, RemixContext, Route, RouteManifest,
    StaticRouteSource,
};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const ROOT_SOURCE: &str = r#"import { Outlet } from "@remix-run/react";
export const links = () => [];
export default function Root() {
  return <Outlet />;
}
"#;

pub const ABOUT_SOURCE: &str = r#"import { json } from "@remix-run/node";
import { db } from "../db.server";
export const loader = async () => json(await db.about());
export default function About() {
  return <h1>About</h1>;
}
"#;

/// An app with `root` and `routes/about` plus both entry files.
pub struct Project {
    pub dir: TempDir,
    pub routes: Arc<StaticRouteSource>,
}

impl Project {
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
            routes: Arc::new(StaticRouteSource::new(default_routes())),
        };
        project.write("app/entry.client.tsx", "import { RemixBrowser } from \"@remix-run/react\";\n");
        project.write("app/entry.server.tsx", "export default function handleRequest() {}\n");
        project.write("app/root.tsx", ROOT_SOURCE);
        project.write("app/routes/about.tsx", ABOUT_SOURCE);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn loader(&self) -> ContextLoader {
        ContextLoader::new(self.root(), self.routes.clone())
    }

    pub async fn context(&self) -> RemixContext {
        self.loader().load().await.unwrap()
    }

    pub async fn context_with(&self, overrides: serde_json::Value) -> RemixContext {
        self.loader().with_overrides(overrides).load().await.unwrap()
    }

    /// Write the client build's chunk manifest. `about_file` names the
    /// about route's output chunk; `None` leaves the route out entirely.
    pub fn write_bundler_manifest(&self, about_file: Option<&str>) {
        let mut chunks = serde_json::json!({
            "app/entry.client.tsx": {
                "file": "assets/entry.client-8f2a.js",
                "isEntry": true,
                "imports": ["_components-1b3c.js"],
                "css": ["assets/global-77aa.css"]
            },
            "app/root.tsx?client-route=1": {
                "file": "assets/root-0c1d.js",
                "isEntry": true,
                "imports": ["_components-1b3c.js"]
            },
            "_components-1b3c.js": {
                "file": "assets/components-1b3c.js",
                "css": ["assets/components-5e6f.css"]
            }
        });
        if let Some(file) = about_file {
            chunks["app/routes/about.tsx?client-route=1"] = serde_json::json!({
                "file": file,
                "isEntry": true,
                "imports": ["_components-1b3c.js"]
            });
        }
        self.write(
            "build/client/.vite/manifest.json",
            &serde_json::to_string_pretty(&chunks).unwrap(),
        );
    }
}

pub fn default_routes() -> RouteManifest {
    RouteManifest::new([
        Route::new("root", "root.tsx"),
        Route::new("routes/about", "routes/about.tsx")
            .with_parent("root")
            .with_path("about"),
    ])
}

/// Module graph that remembers every invalidated id.
#[derive(Debug, Default)]
pub struct RecordingGraph {
    pub invalidated: Mutex<Vec<String>>,
}

impl RecordingGraph {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.invalidated.lock())
    }
}

impl ModuleGraph for RecordingGraph {
    fn invalidate(&self, id: &str) {
        self.invalidated.lock().push(id.to_string());
    }
}

/// HMR channel that remembers every event.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    pub events: Mutex<Vec<HmrEvent>>,
}

impl RecordingChannel {
    pub fn take(&self) -> Vec<HmrEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl HmrChannel for RecordingChannel {
    fn send(&self, event: HmrEvent) {
        self.events.lock().push(event);
    }
}
