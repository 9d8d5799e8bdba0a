use super::ModuleIntrospector;
use super::lexer;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reads route modules from disk and lexes their exports with oxc.
///
/// Runs outside the bundler's plugin list, so classifying a route never
/// re-enters this plugin's own hooks.
#[derive(Debug, Default)]
pub struct OxcIntrospector {
    closed: AtomicBool,
}

impl OxcIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ModuleIntrospector for OxcIntrospector {
    async fn exports(&self, path: &Path) -> Result<Vec<String>> {
        if self.is_closed() {
            return Err(Error::IntrospectorClosed(path.to_path_buf()));
        }

        let source = match tokio::fs::read_to_string(path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::UnresolvableModule(path.to_path_buf()));
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        let names = lexer::export_names(&source, path)?;
        tracing::debug!(path = %path.display(), exports = ?names, "classified module exports");
        Ok(names)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
