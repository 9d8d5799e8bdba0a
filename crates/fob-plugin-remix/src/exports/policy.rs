//! Client/server boundary rules for route modules.

use super::{CLIENT_ROUTE_EXPORTS, HYDRATE_FALLBACK_EXPORT, SERVER_ONLY_ROUTE_EXPORTS, exports_in};
use crate::context::RemixContext;
use crate::error::{Error, Result};
use crate::route::{Route, RouteFileRef, is_server_only_module};

/// Reject exports that cannot work under the configured rendering mode.
///
/// Only SPA mode restricts exports: no server-only exports anywhere and no
/// `HydrateFallback` outside the root route.
pub fn validate_route_exports(route: &Route, exports: &[String], spa_mode: bool) -> Result<()> {
    if !spa_mode {
        return Ok(());
    }

    let server_only = exports_in(exports, SERVER_ONLY_ROUTE_EXPORTS);
    if !server_only.is_empty() {
        return Err(Error::SpaModeServerExports {
            file: route.file.clone(),
            exports: server_only.into_iter().map(str::to_string).collect(),
        });
    }

    if !route.is_root() && exports.iter().any(|name| name == HYDRATE_FALLBACK_EXPORT) {
        return Err(Error::SpaModeHydrateFallback {
            file: route.file.clone(),
        });
    }

    Ok(())
}

/// Fail when a module of the client graph imports a `.server` module.
///
/// `resolved_id` is checked too so aliases like `~/db` pointing at
/// `db.server.ts` are caught. Entry modules (no importer) are never rejected.
pub fn check_client_import(
    ctx: &RemixContext,
    specifier: &str,
    resolved_id: Option<&str>,
    importer: Option<&str>,
) -> Result<()> {
    let server_only =
        is_server_only_module(specifier) || resolved_id.is_some_and(is_server_only_module);
    if !server_only {
        return Ok(());
    }
    let Some(importer) = importer else {
        return Ok(());
    };

    let importer_path = RouteFileRef::parse(importer).path;
    Err(Error::ServerOnlyModuleInClient {
        specifier: specifier.to_string(),
        importer: ctx.root_relative(&importer_path),
        is_route: ctx.route_for_file(&importer_path).is_some(),
    })
}

/// Module body replacing a `.client` module in the server build.
///
/// Names that cannot be declared directly, such as `"a-b"` or `class`, are
/// exported through a local alias.
pub fn client_only_stub(exports: &[String]) -> String {
    exports
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if name == "default" {
                "export default undefined;".to_string()
            } else if is_declarable_identifier(name) {
                format!("export const {} = undefined;", name)
            } else {
                format!(
                    "const __stub{index} = undefined;\nexport {{ __stub{index} as {} }};",
                    serde_json::Value::String(name.clone())
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

fn is_declarable_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}

/// Re-export the client-safe exports of a route file from its own directory.
pub fn client_route_module(file_name: &str, exports: &[String]) -> String {
    let reexports = exports_in(exports, CLIENT_ROUTE_EXPORTS);
    format!(
        "export {{ {} }} from {};",
        reexports.join(", "),
        serde_json::Value::String(format!("./{}", file_name))
    )
}
