//! Route records, the route manifest and references to route files.
//!
//! The route manifest comes from an external route source and is only ever
//! replaced as a whole. File references carry a [`RouteVariant`] instead of
//! relying on callers to sniff query strings.

use indexmap::IndexMap;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Query suffix selecting the client-safe re-export variant of a route file.
pub const CLIENT_ROUTE_QUERY: &str = "?client-route=1";

/// Id of the route every other route descends from.
pub const ROOT_ROUTE_ID: &str = "root";

/// One URL-addressable unit of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,

    /// Source file relative to the app directory
    pub file: String,
}

impl Route {
    /// Route with only the required fields set.
    pub fn new(id: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            path: None,
            index: None,
            case_sensitive: None,
            file: file.into(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_index(mut self, index: bool) -> Self {
        self.index = Some(index);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none() && self.id == ROOT_ROUTE_ID
    }
}

/// Routes keyed by id, in the order the route source produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteManifest {
    routes: IndexMap<String, Route>,
}

impl RouteManifest {
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|route| (route.id.clone(), route))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route whose file, resolved against `app_directory`, is `path`.
    pub fn find_by_file(&self, app_directory: &Path, path: &Path) -> Option<&Route> {
        let path = path.clean();
        self.iter()
            .find(|route| app_directory.join(&route.file).clean() == path)
    }

    /// The route and its ancestors, root first.
    ///
    /// Stops at a missing parent rather than failing; the route source owns
    /// tree consistency.
    pub fn branch(&self, id: &str) -> Vec<&Route> {
        let mut branch = Vec::new();
        let mut current = self.get(id);
        while let Some(route) = current {
            if branch.iter().any(|seen: &&Route| seen.id == route.id) {
                break;
            }
            branch.push(route);
            current = route.parent_id.as_deref().and_then(|parent| self.get(parent));
        }
        branch.reverse();
        branch
    }
}

/// Which view of a route file a module id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteVariant {
    /// The file as written
    Full,
    /// Re-exports of the client-safe exports only
    ClientOnly,
}

/// A module id split into the real file and its route variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteFileRef {
    pub path: PathBuf,
    pub variant: RouteVariant,
}

impl RouteFileRef {
    /// Parse a bundler module id. The client-route query is removed from the path.
    pub fn parse(id: &str) -> Self {
        match id.strip_suffix(CLIENT_ROUTE_QUERY) {
            Some(path) => Self {
                path: PathBuf::from(path),
                variant: RouteVariant::ClientOnly,
            },
            None => Self {
                path: PathBuf::from(id),
                variant: RouteVariant::Full,
            },
        }
    }

    pub fn client_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            variant: RouteVariant::ClientOnly,
        }
    }

    /// The module id handed back to the bundler.
    pub fn to_id(&self) -> String {
        let path = self.path.to_string_lossy();
        match self.variant {
            RouteVariant::Full => path.into_owned(),
            RouteVariant::ClientOnly => format!("{}{}", path, CLIENT_ROUTE_QUERY),
        }
    }
}

/// Drop any `?query` from a module id.
pub fn strip_query(id: &str) -> &str {
    id.split_once('?').map(|(path, _)| path).unwrap_or(id)
}

/// `foo.server`, `foo.server.ts`, or anything under a `.server` directory.
pub fn is_server_only_module(id: &str) -> bool {
    has_marker(strip_query(id), "server")
}

/// `foo.client`, `foo.client.tsx`, or anything under a `.client` directory.
pub fn is_client_only_module(id: &str) -> bool {
    has_marker(strip_query(id), "client")
}

fn has_marker(path: &str, marker: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let dir_marker = format!("/.{}/", marker);
    if normalized.contains(&dir_marker) || normalized.starts_with(&dir_marker[1..]) {
        return true;
    }

    let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
    let stem = strip_script_extension(file_name);
    stem.ends_with(&format!(".{}", marker))
}

fn strip_script_extension(file_name: &str) -> &str {
    let Some((stem, ext)) = file_name.rsplit_once('.') else {
        return file_name;
    };
    // [cm]?[jt]sx?
    let ext = ext.strip_prefix(['c', 'm']).unwrap_or(ext);
    let ext = ext.strip_suffix('x').unwrap_or(ext);
    if ext == "js" || ext == "ts" { stem } else { file_name }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> RouteManifest {
        RouteManifest::new([
            Route::new("root", "root.tsx"),
            Route::new("routes/about", "routes/about.tsx")
                .with_parent("root")
                .with_path("about"),
            Route::new("routes/about.team", "routes/about.team.tsx")
                .with_parent("routes/about")
                .with_path("team"),
        ])
    }

    #[test]
    fn test_branch_is_root_first() {
        let manifest = manifest();
        let ids: Vec<_> = manifest
            .branch("routes/about.team")
            .iter()
            .map(|route| route.id.as_str())
            .collect();
        assert_eq!(ids, vec!["root", "routes/about", "routes/about.team"]);
    }

    #[test]
    fn test_find_by_file() {
        let manifest = manifest();
        let route = manifest
            .find_by_file(Path::new("/project/app"), Path::new("/project/app/routes/about.tsx"))
            .unwrap();
        assert_eq!(route.id, "routes/about");
        assert!(manifest.get("root").unwrap().is_root());
    }

    #[test]
    fn test_find_by_file_with_dotted_route_file() {
        let manifest = RouteManifest::new([
            Route::new("root", "root.tsx"),
            Route::new("routes/x", "./routes/x.tsx").with_parent("root"),
        ]);
        let route = manifest
            .find_by_file(Path::new("/project/app"), Path::new("/project/app/routes/x.tsx"))
            .unwrap();
        assert_eq!(route.id, "routes/x");
        assert!(
            manifest
                .find_by_file(Path::new("/project/app"), Path::new("/project/app/../app/routes/x.tsx"))
                .is_some()
        );
    }

    #[test]
    fn test_route_serializes_without_missing_fields() {
        let json = serde_json::to_value(Route::new("root", "root.tsx")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "root", "file": "root.tsx" }));
    }

    #[test]
    fn test_route_file_ref() {
        let full = RouteFileRef::parse("/app/routes/index.tsx");
        assert_eq!(full.variant, RouteVariant::Full);

        let client = RouteFileRef::parse("/app/routes/index.tsx?client-route=1");
        assert_eq!(client.variant, RouteVariant::ClientOnly);
        assert_eq!(client.path, PathBuf::from("/app/routes/index.tsx"));
        assert_eq!(client.to_id(), "/app/routes/index.tsx?client-route=1");
    }

    #[test]
    fn test_server_only_detection() {
        assert!(is_server_only_module("/app/utils/db.server.ts"));
        assert!(is_server_only_module("~/db.server"));
        assert!(is_server_only_module("/app/.server/secrets.ts"));
        assert!(is_server_only_module("/app/utils/db.server.mjs?v=1"));
        assert!(!is_server_only_module("/app/utils/server.ts"));
        assert!(!is_server_only_module("/app/utils/db.serverless.ts"));
        assert!(!is_server_only_module("/app/routes/entry.server.css"));
    }

    #[test]
    fn test_client_only_detection() {
        assert!(is_client_only_module("/app/utils/analytics.client.tsx"));
        assert!(is_client_only_module("/app/.client/window.ts"));
        assert!(!is_client_only_module("/app/utils/client.ts"));
    }
}
