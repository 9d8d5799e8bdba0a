//! Production manifest synthesis against a real app directory.

mod common;

use common::Project;
use fob_plugin_remix::manifest::production::build_production_manifest;
use fob_plugin_remix::{
    BundlerManifest, Error, OxcIntrospector, synthesize_production_manifest,
};
use std::fs;

#[tokio::test]
async fn test_route_capabilities_and_assets() {
    let project = Project::new();
    project.write_bundler_manifest(Some("assets/about-3d9e.js"));
    let ctx = project.context().await;

    let written = synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap();
    let manifest = &written.manifest;

    let about = &manifest.routes["routes/about"];
    assert!(about.has_loader);
    assert!(!about.has_action);
    assert!(!about.has_client_loader);
    assert_eq!(about.module, "/assets/about-3d9e.js");
    assert_eq!(about.imports, vec!["/assets/components-1b3c.js"]);
    assert_eq!(about.parent_id.as_deref(), Some("root"));

    // The root route carries the client entry's global stylesheet.
    let root = &manifest.routes["root"];
    assert_eq!(root.module, "/assets/root-0c1d.js");
    assert!(root.css.contains(&"/assets/global-77aa.css".to_string()));
    assert!(root.css.contains(&"/assets/components-5e6f.css".to_string()));

    assert_eq!(manifest.entry.module, "/assets/entry.client-8f2a.js");
    assert!(manifest.hmr.is_none());
    assert_eq!(manifest.url, format!("/assets/manifest-{}.js", manifest.version));
}

#[tokio::test]
async fn test_manifest_file_is_a_plain_script() {
    let project = Project::new();
    project.write_bundler_manifest(Some("assets/about-3d9e.js"));
    let ctx = project.context().await;

    let written = synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap();

    let expected = project.path(&format!(
        "build/client/assets/manifest-{}.js",
        written.manifest.version
    ));
    assert_eq!(written.path, expected);

    let content = fs::read_to_string(&expected).unwrap();
    let json = content
        .strip_prefix("window.__remixManifest=")
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(parsed["version"], written.manifest.version.as_str());
    assert_eq!(parsed["routes"]["routes/about"]["hasLoader"], true);
    assert!(!project.path("build/.vite/remix-manifest.json").exists());
}

#[tokio::test]
async fn test_version_is_a_function_of_assets() {
    let project = Project::new();
    let ctx = project.context().await;
    let introspector = OxcIntrospector::new();

    project.write_bundler_manifest(Some("assets/about-3d9e.js"));
    let chunks = BundlerManifest::read(&ctx.bundler_manifest_path()).await.unwrap();
    let first = build_production_manifest(&ctx, &introspector, &chunks).await.unwrap();
    let second = build_production_manifest(&ctx, &introspector, &chunks).await.unwrap();
    assert_eq!(first.version, second.version);
    assert_eq!(first.version.len(), 8);

    project.write_bundler_manifest(Some("assets/about-99ff.js"));
    let chunks = BundlerManifest::read(&ctx.bundler_manifest_path()).await.unwrap();
    let changed = build_production_manifest(&ctx, &introspector, &chunks).await.unwrap();
    assert_ne!(first.version, changed.version);
}

#[tokio::test]
async fn test_spa_mode_rejects_loader() {
    let project = Project::new();
    project.write_bundler_manifest(Some("assets/about-3d9e.js"));
    let ctx = project.context_with(serde_json::json!({ "ssr": false })).await;

    let err = synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap_err();
    match err {
        Error::SpaModeServerExports { file, exports } => {
            assert_eq!(file, "routes/about.tsx");
            assert_eq!(exports, vec!["loader".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!project.path("build/client/assets").exists());
}

#[tokio::test]
async fn test_spa_mode_hydrate_fallback_only_on_root() {
    let project = Project::new();
    project.write_bundler_manifest(Some("assets/about-3d9e.js"));
    project.write(
        "app/routes/about.tsx",
        "export function HydrateFallback() { return null; }\nexport default function About() { return null; }\n",
    );
    let ctx = project.context_with(serde_json::json!({ "ssr": false })).await;

    let err = synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SpaModeHydrateFallback { ref file } if file == "routes/about.tsx"));

    project.write(
        "app/routes/about.tsx",
        "export default function About() { return null; }\n",
    );
    project.write(
        "app/root.tsx",
        "export function HydrateFallback() { return null; }\nexport default function Root() { return null; }\n",
    );
    let written = synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap();
    assert!(!written.manifest.routes["routes/about"].has_loader);
}

#[tokio::test]
async fn test_missing_manifest_key_lists_known_keys() {
    let project = Project::new();
    project.write_bundler_manifest(None);
    let ctx = project.context().await;

    let err = synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap_err();
    match err {
        Error::ManifestEntryNotFound { key, known_keys } => {
            assert_eq!(key, "app/routes/about.tsx");
            assert!(known_keys.contains(&"app/root.tsx?client-route=1".to_string()));
            assert!(known_keys.contains(&"app/entry.client.tsx".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_bundler_manifest() {
    let project = Project::new();
    let ctx = project.context().await;

    let err = synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[tokio::test]
async fn test_build_report_written_when_enabled() {
    let project = Project::new();
    project.write_bundler_manifest(Some("assets/about-3d9e.js"));
    let ctx = project.context_with(serde_json::json!({ "manifest": true })).await;

    synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap();

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(project.path("build/.vite/remix-manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["routes"]["routes/about"]["parentId"], "root");
    assert!(report.get("serverBundles").is_none());
}

#[tokio::test]
async fn test_parse_error_aborts_synthesis() {
    let project = Project::new();
    project.write_bundler_manifest(Some("assets/about-3d9e.js"));
    project.write("app/routes/about.tsx", "export const loader = (;\n");
    let ctx = project.context().await;

    let err = synthesize_production_manifest(&ctx, &OxcIntrospector::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Compilation { .. }));
}
