use crate::context::RemixContext;
use crate::error::Result;
use crate::virtual_module::VirtualModule;
use serde::Serialize;
use std::path::Path;

/// Source of the generated server entry module.
///
/// Imports the server entry and every route module, then exports the route
/// table and build constants the request handler needs. Regenerated whenever
/// the context changes.
pub fn synthesize_server_entry_source(ctx: &RemixContext) -> Result<String> {
    let options = &ctx.options;
    let mut lines = vec![format!(
        "import * as entryServer from {};",
        js(&module_path(&ctx.entry_server_file))?
    )];
    for (index, route) in ctx.routes.iter().enumerate() {
        lines.push(format!(
            "import * as route{} from {};",
            index,
            js(&module_path(&ctx.route_file(route)))?
        ));
    }

    lines.push(format!(
        "export {{ default as assets }} from {};",
        js(VirtualModule::ServerManifest.id())?
    ));
    lines.push(format!(
        "export const assetsBuildDirectory = {};",
        js(&ctx.root_relative(&ctx.client_build_directory()))?
    ));
    lines.push(format!("export const basename = {};", js(&options.basename)?));
    lines.push(format!("export const future = {};", js(&options.future)?));
    lines.push(format!("export const isSpaMode = {};", options.is_spa_mode()));
    lines.push(format!("export const publicPath = {};", js(&options.public_path)?));
    lines.push("export const entry = { module: entryServer };".to_string());

    let mut table = Vec::with_capacity(ctx.routes.len());
    for (index, route) in ctx.routes.iter().enumerate() {
        table.push(format!(
            "  {}: {{\n    id: {},\n    parentId: {},\n    path: {},\n    index: {},\n    caseSensitive: {},\n    module: route{}\n  }}",
            js(&route.id)?,
            js(&route.id)?,
            js(&route.parent_id)?,
            js(&route.path)?,
            js(&route.index)?,
            js(&route.case_sensitive)?,
            index
        ));
    }
    lines.push(format!("export const routes = {{\n{}\n}};", table.join(",\n")));

    Ok(lines.join("\n") + "\n")
}

/// JavaScript literal for `value`; `None` becomes `undefined`.
fn js<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value)?;
    Ok(if json.is_null() {
        "undefined".to_string()
    } else {
        json.to_string()
    })
}

fn module_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
