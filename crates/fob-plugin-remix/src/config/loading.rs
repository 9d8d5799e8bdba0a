use crate::config::RemixPluginOptions;
use crate::error::{Error, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use std::path::{Path, PathBuf};

/// Config file picked up from the project root when no path is given.
pub const CONFIG_FILE_NAME: &str = "remix.config.json";

/// Environment keys (after the `REMIX_` prefix) mapped to option names.
const ENV_KEYS: &[(&str, &str)] = &[
    ("app_directory", "appDirectory"),
    ("build_directory", "buildDirectory"),
    ("server_build_file", "serverBuildFile"),
    ("public_path", "publicPath"),
    ("assets_dir", "assetsDir"),
    ("basename", "basename"),
    ("ssr", "ssr"),
    ("manifest", "manifest"),
];

impl RemixPluginOptions {
    /// Load options from multiple sources.
    /// Priority: overrides > environment variables > config file > defaults
    ///
    /// `config_path` must exist when given. Without it, `remix.config.json` in
    /// `root` is used if present.
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        overrides: Option<&serde_json::Value>,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = Self::config_file(root, config_path)? {
            figment = figment.merge(Json::file(path));
        }

        // REMIX_SSR, REMIX_PUBLIC_PATH, ...
        figment = figment.merge(
            Env::prefixed("REMIX_")
                .filter(|key| ENV_KEYS.iter().any(|(env, _)| key == *env))
                .map(|key| {
                    ENV_KEYS
                        .iter()
                        .find(|(env, _)| key == *env)
                        .map(|(_, field)| (*field).into())
                        .unwrap_or_else(|| key.as_str().to_string().into())
                }),
        );

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let options: Self = figment.extract().map_err(|e| Error::InvalidConfig {
            field: "configuration".to_string(),
            message: e.to_string(),
        })?;

        options.validate()?;
        Ok(options)
    }

    /// Resolve the config file location.
    ///
    /// Returns `Ok(None)` when no explicit path was given and the default file
    /// does not exist.
    pub fn config_file(root: &Path, config_path: Option<&Path>) -> Result<Option<PathBuf>> {
        match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                };
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path));
                }
                Ok(Some(path))
            }
            None => {
                let default_path = root.join(CONFIG_FILE_NAME);
                Ok(default_path.exists().then_some(default_path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let options = RemixPluginOptions::load(dir.path(), None, None).unwrap();
        assert_eq!(options.app_directory, PathBuf::from("app"));
        assert!(options.ssr);
    }

    #[test]
    fn test_load_from_default_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "ssr": false, "publicPath": "/static/" }"#,
        )
        .unwrap();

        let options = RemixPluginOptions::load(dir.path(), None, None).unwrap();
        assert!(!options.ssr);
        assert_eq!(options.public_path, "/static/");
    }

    #[test]
    fn test_explicit_missing_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = RemixPluginOptions::load(dir.path(), Some(Path::new("custom.json")), None);
        assert!(matches!(result, Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "basename": "/app" }"#,
        )
        .unwrap();

        let overrides = serde_json::json!({ "basename": "/admin" });
        let options = RemixPluginOptions::load(dir.path(), None, Some(&overrides)).unwrap();
        assert_eq!(options.basename, "/admin");
    }

    #[test]
    fn test_invalid_file_reports_config_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "ssr": "maybe" }"#).unwrap();

        let result = RemixPluginOptions::load(dir.path(), None, None);
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
