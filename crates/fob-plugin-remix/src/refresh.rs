//! React Refresh glue for development client builds.
//!
//! Two virtual modules carry the runtime: `hmr-runtime` wraps the CommonJS
//! build of `react-refresh` as an ES module, `inject-hmr-runtime` installs it
//! onto `window` before any component module runs. Route modules are wrapped
//! with a header and footer that register their components and push fresh
//! route metadata to the router on every hot update.

use crate::dev::HMR_EVENT;
use crate::error::{Error, Result};
use crate::virtual_module::VirtualModule;
use std::path::Path;

/// Location of the refresh runtime relative to the project root.
pub const REFRESH_RUNTIME_PATH: &str =
    "node_modules/react-refresh/cjs/react-refresh-runtime.development.js";

const NODE_ENV_DEVELOPMENT: &str = "\"development\"";

const REFRESH_UTILITIES: &str = r#"
function debounce(fn, delay) {
  let handle;
  return () => {
    clearTimeout(handle);
    handle = setTimeout(fn, delay);
  };
}

const routeUpdates = new Map();

const enqueueUpdate = debounce(async () => {
  const manifest = window.__remixManifest;
  let changed = false;
  if (manifest) {
    for (const [id, route] of routeUpdates) {
      manifest.routes[id] = Object.assign(manifest.routes[id] ?? {}, route);
      changed = true;
    }
  }
  routeUpdates.clear();
  if (window.__remixRouteModuleUpdates && window.__remixRouteModuleUpdates.size > 0) {
    changed = true;
  }
  if (changed) {
    if (window.__remixRevalidate) {
      await window.__remixRevalidate();
    }
    if (window.__remixRouteModuleUpdates) {
      window.__remixRouteModuleUpdates.clear();
    }
  }
  exports.performReactRefresh();
}, 16);

function registerExportsForReactRefresh(filename, moduleExports) {
  for (const key in moduleExports) {
    if (key === "__esModule") continue;
    const value = moduleExports[key];
    if (exports.isLikelyComponentType(value)) {
      exports.register(value, filename + " export " + key);
    }
  }
}

function validateRefreshBoundaryAndEnqueueUpdate(prevExports, nextExports) {
  for (const key in prevExports) {
    if (!(key in nextExports)) return "Could not Fast Refresh (export removed)";
  }
  for (const key in nextExports) {
    if (!(key in prevExports)) return "Could not Fast Refresh (new export)";
  }
  enqueueUpdate();
}

function __hmr_import(module) {
  return import(/* @vite-ignore */ module);
}

exports.__hmr_import = __hmr_import;
exports.registerExportsForReactRefresh = registerExportsForReactRefresh;
exports.validateRefreshBoundaryAndEnqueueUpdate = validateRefreshBoundaryAndEnqueueUpdate;
exports.enqueueUpdate = enqueueUpdate;
"#;

/// Source of the `hmr-runtime` module.
pub async fn hmr_runtime_module(root: &Path) -> Result<String> {
    let path = root.join(REFRESH_RUNTIME_PATH);
    let runtime = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| Error::io(&path, e))?;

    let runtime = runtime.replace("process.env.NODE_ENV", NODE_ENV_DEVELOPMENT);
    Ok(format!(
        "const exports = {{}};\n{}\n{}\n{}\nexport default exports;\n",
        runtime,
        REFRESH_UTILITIES,
        route_update_listener()?
    ))
}

/// Stores the route metadata of each hot update until the next refresh.
fn route_update_listener() -> Result<String> {
    let event = serde_json::to_string(HMR_EVENT)?;
    Ok(format!(
        r#"if (import.meta.hot) {{
  import.meta.hot.on({event}, (data) => {{
    if (data && data.route) {{
      routeUpdates.set(data.route.id, data.route);
      enqueueUpdate();
    }}
  }});
}}
"#
    ))
}

/// Source of the `inject-hmr-runtime` module.
pub fn hmr_injector_module() -> String {
    format!(
        r#"import RefreshRuntime from "{}";
RefreshRuntime.injectIntoGlobalHook(window);
window.$RefreshReg$ = () => {{}};
window.$RefreshSig$ = () => (type) => type;
window.__vite_plugin_react_preamble_installed__ = true;
"#,
        VirtualModule::HmrRuntime.url()
    )
}

/// Wrap a transformed route module so its components hot-swap in place.
///
/// `id` is the module id the registrations are keyed by; `route_id` names the
/// route whose metadata the footer forwards.
pub fn wrap_route_module(code: &str, id: &str, route_id: &str) -> Result<String> {
    let id = serde_json::to_string(id)?;
    let route_id = serde_json::to_string(route_id)?;
    let runtime_url = serde_json::to_string(&VirtualModule::HmrRuntime.url())?;

    let header = format!(
        r#"import RefreshRuntime from {runtime_url};
const inWebWorker = typeof WorkerGlobalScope !== "undefined" && self instanceof WorkerGlobalScope;
let prevRefreshReg;
let prevRefreshSig;
if (import.meta.hot && !inWebWorker) {{
  prevRefreshReg = window.$RefreshReg$;
  prevRefreshSig = window.$RefreshSig$;
  window.$RefreshReg$ = (type, id) => {{
    RefreshRuntime.register(type, {id} + " " + id);
  }};
  window.$RefreshSig$ = RefreshRuntime.createSignatureFunctionForTransform;
}}
"#
    );

    let footer = format!(
        r#"
if (import.meta.hot && !inWebWorker) {{
  window.$RefreshReg$ = prevRefreshReg;
  window.$RefreshSig$ = prevRefreshSig;
  RefreshRuntime.__hmr_import(import.meta.url).then((currentExports) => {{
    RefreshRuntime.registerExportsForReactRefresh({id}, currentExports);
    import.meta.hot.accept((nextExports) => {{
      if (!nextExports) return;
      if (!window.__remixRouteModuleUpdates) {{
        window.__remixRouteModuleUpdates = new Map();
      }}
      window.__remixRouteModuleUpdates.set({route_id}, {{ module: nextExports }});
      const invalidateMessage = RefreshRuntime.validateRefreshBoundaryAndEnqueueUpdate(currentExports, nextExports);
      if (invalidateMessage) import.meta.hot.invalidate(invalidateMessage);
    }});
  }});
}}
"#
    );

    Ok(format!("{}{}{}", header, code, footer))
}
