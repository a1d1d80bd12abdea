//! Text file adapter
//!
//! One row per line, fields joined by `", "` and led by the assertion key:
//!
//! ```text
//! p, alice, data1, read
//! g, alice, admin
//! ```

use super::{load_policy_line, parse_policy_line, policy_lines, Adapter, Filter};
use crate::error::{AdapterError, Result};
use crate::model::Model;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Adapter backed by a policy text file
#[derive(Debug)]
pub struct FileAdapter {
    path: PathBuf,
    filtered: AtomicBool,
}

impl FileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filtered: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fail unless the path names an existing regular file
    async fn check_path(&self) -> Result<()> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(AdapterError::InvalidFilePath(self.path.display().to_string()).into()),
        }
    }
}

#[async_trait]
impl Adapter for FileAdapter {
    async fn load_policy(&self, model: &mut Model) -> Result<()> {
        self.check_path().await?;
        let text = tokio::fs::read_to_string(&self.path).await?;
        for line in text.lines() {
            load_policy_line(line, model);
        }
        self.filtered.store(false, Ordering::SeqCst);
        debug!(path = %self.path.display(), "Loaded policy file");
        Ok(())
    }

    async fn save_policy(&self, model: &Model) -> Result<()> {
        self.check_path().await?;
        tokio::fs::write(&self.path, policy_lines(model).join("\n")).await?;
        debug!(path = %self.path.display(), "Saved policy file");
        Ok(())
    }

    async fn load_filtered_policy(&self, model: &mut Model, filter: &Filter) -> Result<()> {
        self.check_path().await?;
        let text = tokio::fs::read_to_string(&self.path).await?;
        for line in text.lines() {
            let Some((key, rule)) = parse_policy_line(line) else {
                continue;
            };
            let sec = key.get(..1).unwrap_or_default();
            if filter.accepts(sec, &rule) {
                super::load_policy_rule(&key, rule, model);
            }
        }
        self.filtered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered.load(Ordering::SeqCst)
    }
}
