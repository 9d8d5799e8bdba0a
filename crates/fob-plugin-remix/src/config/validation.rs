use crate::config::{RemixPluginOptions, default_server_build_file};
use crate::error::{Error, Result};

const SERVER_BUILD_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs"];

impl RemixPluginOptions {
    /// Validate options for logical consistency.
    ///
    /// Redundant combinations only log a warning; unsafe ones are errors.
    pub fn validate(&self) -> Result<()> {
        if !self.public_path.ends_with('/') {
            return Err(Error::InvalidConfig {
                field: "publicPath".to_string(),
                message: format!("must end with '/' (got '{}')", self.public_path),
            });
        }

        if !self.basename.starts_with('/') {
            return Err(Error::InvalidConfig {
                field: "basename".to_string(),
                message: format!("must start with '/' (got '{}')", self.basename),
            });
        }

        if !SERVER_BUILD_EXTENSIONS
            .iter()
            .any(|ext| self.server_build_file.ends_with(ext))
        {
            return Err(Error::InvalidConfig {
                field: "serverBuildFile".to_string(),
                message: format!(
                    "must end with .js, .mjs or .cjs (got '{}')",
                    self.server_build_file
                ),
            });
        }

        if self.assets_dir.is_empty() {
            return Err(Error::InvalidConfig {
                field: "assetsDir".to_string(),
                message: "cannot be empty".to_string(),
            });
        }

        if !self.ssr {
            if self.server_bundles.is_some() {
                return Err(Error::ConflictingOptions(
                    "The `serverBundles` option is not supported with `ssr: false`".to_string(),
                ));
            }

            if self.server_build_file != default_server_build_file() {
                tracing::warn!(
                    server_build_file = %self.server_build_file,
                    "The `serverBuildFile` option has no effect with `ssr: false`"
                );
            }
        }

        Ok(())
    }
}
