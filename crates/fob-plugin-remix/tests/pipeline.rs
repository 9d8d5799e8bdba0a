//! Resolve/load/transform through the pipeline and the Rolldown adapter.

mod common;

use common::Project;
use fob_plugin_remix::{
    BuildMode, BuildTarget, ContextHandle, Error, FobRemixPlugin, ModuleIntrospector,
    OxcIntrospector, RemixPipeline, VirtualModule, synthesize_development_manifest,
};
use rolldown_plugin::{HookLoadArgs, Plugin, PluginContext};
use std::sync::Arc;

async fn pipeline(project: &Project, target: BuildTarget, mode: BuildMode) -> RemixPipeline {
    RemixPipeline::new(
        Arc::new(ContextHandle::new(project.context().await)),
        Arc::new(OxcIntrospector::new()),
        target,
        mode,
    )
}

#[tokio::test]
async fn test_development_manifest_points_at_sources() {
    let project = Project::new();
    let ctx = project.context().await;
    let introspector = OxcIntrospector::new();

    let first = synthesize_development_manifest(&ctx, &introspector).await.unwrap();
    let second = synthesize_development_manifest(&ctx, &introspector).await.unwrap();

    assert_eq!(first.entry.module, "/app/entry.client.tsx");
    assert!(first.entry.imports.is_empty());
    assert_eq!(first.routes["routes/about"].module, "/app/routes/about.tsx?import");
    assert!(first.routes["routes/about"].imports.is_empty());
    assert!(first.routes["routes/about"].has_loader);
    assert_eq!(first.url, "/@id/__x00__virtual:remix/browser-manifest");
    assert_eq!(
        first.hmr.as_ref().unwrap().runtime,
        "/@id/__x00__virtual:remix/inject-hmr-runtime"
    );
    assert!(uuid::Uuid::parse_str(&first.version).is_ok());
    assert_ne!(first.version, second.version);
    assert!(!project.path("build").exists());
}

#[tokio::test]
async fn test_server_build_loads_cached_production_manifest() {
    let project = Project::new();
    project.write_bundler_manifest(Some("assets/about-3d9e.js"));
    let p = pipeline(&project, BuildTarget::Server, BuildMode::Production).await;

    let entry = p
        .load(&VirtualModule::ServerBuild.resolved_id())
        .await
        .unwrap()
        .unwrap();
    assert!(entry.contains("export { default as assets } from \"virtual:remix/server-manifest\";"));
    assert!(entry.contains(&format!(
        "import * as route1 from \"{}\";",
        project.path("app/routes/about.tsx").display()
    )));

    let id = VirtualModule::ServerManifest.resolved_id();
    let first = p.load(&id).await.unwrap().unwrap();
    let second = p.load(&id).await.unwrap().unwrap();
    assert!(first.starts_with("export default {"));
    assert_eq!(first, second);

    let written: Vec<_> = std::fs::read_dir(project.path("build/client/assets"))
        .unwrap()
        .collect();
    assert_eq!(written.len(), 1);
}

#[tokio::test]
async fn test_client_route_variant_from_disk() {
    let project = Project::new();
    let p = pipeline(&project, BuildTarget::Client, BuildMode::Production).await;

    let inputs = p.client_build_inputs();
    let about = project.path("app/routes/about.tsx");
    assert!(inputs.contains(&format!("{}?client-route=1", about.display())));
    assert_eq!(
        inputs[0],
        project.path("app/entry.client.tsx").to_string_lossy()
    );

    let code = p
        .load(&format!("{}?client-route=1", about.display()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(code, r#"export { default } from "./about.tsx";"#);
}

#[tokio::test]
async fn test_client_transform_removes_server_code() {
    let project = Project::new();
    let p = pipeline(&project, BuildTarget::Client, BuildMode::Production).await;
    let about = project.path("app/routes/about.tsx");

    let out = p
        .transform(common::ABOUT_SOURCE, &about.to_string_lossy())
        .await
        .unwrap()
        .unwrap();
    assert!(!out.contains("loader"));
    assert!(!out.contains("db.server"));
    assert!(!out.contains("@remix-run/node"));
    assert!(out.contains("export default function About()"));
}

#[tokio::test]
async fn test_closed_introspector_rejects_work() {
    let project = Project::new();
    let p = pipeline(&project, BuildTarget::Client, BuildMode::Production).await;
    p.close().await.unwrap();

    let about = project.path("app/routes/about.tsx");
    let err = p
        .load(&format!("{}?client-route=1", about.display()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IntrospectorClosed(_)));
    assert!(p.introspector().exports(&about).await.is_err());
}

#[tokio::test]
async fn test_plugin_serves_dev_modules() {
    let project = Project::new();
    let plugin = FobRemixPlugin::new(Arc::new(
        pipeline(&project, BuildTarget::Client, BuildMode::Development).await,
    ));
    let ctx = PluginContext::new_napi_context();

    let id = VirtualModule::BrowserManifest.resolved_id();
    let output = plugin
        .load(&ctx, &HookLoadArgs { id: &id })
        .await
        .unwrap()
        .unwrap();
    assert!(output.code.starts_with("window.__remixManifest="));
    assert!(plugin.pipeline().last_dev_manifest().is_some());

    let id = VirtualModule::HmrInjector.resolved_id();
    let output = plugin
        .load(&ctx, &HookLoadArgs { id: &id })
        .await
        .unwrap()
        .unwrap();
    assert!(output.code.contains("injectIntoGlobalHook(window)"));
}
