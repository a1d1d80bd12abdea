//! INI-style model text parser
//!
//! Model definitions are plain text:
//!
//! ```text
//! [request_definition]
//! r = sub, obj, act
//!
//! [matchers]
//! m = r.sub == p.sub \
//!     && r.act == p.act
//! ```
//!
//! Values are looked up by `"section::key"`. A key without a section lives in
//! the `default` section. Missing keys read as the empty string, which is what
//! the model loader uses to stop scanning numbered keys.

use crate::error::{ModelError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Section used when a key is set or read without one
pub const DEFAULT_SECTION: &str = "default";

const DEFAULT_COMMENT: char = '#';
const DEFAULT_COMMENT_SEM: char = ';';
const DEFAULT_MULTI_LINE_SEPARATOR: char = '\\';

/// Parsed key/value configuration grouped by section
#[derive(Debug, Clone, Default)]
pub struct Config {
    data: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration text
    pub fn from_text(text: &str) -> Result<Self> {
        let mut config = Self::new();
        config.parse(text)?;
        Ok(config)
    }

    /// Read and parse a configuration file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_text(&text)
    }

    /// Set a value by `"section::key"` or bare `"key"`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(ModelError::InvalidDefinition("key is empty".to_string()).into());
        }

        let lowered = key.to_lowercase();
        let (section, option) = match lowered.split_once("::") {
            Some((section, option)) => (section.to_string(), option.to_string()),
            None => (String::new(), lowered.clone()),
        };

        self.add_config(&section, &option, value);
        Ok(())
    }

    /// Get a value by `"section::key"` or bare `"key"`; missing keys yield `""`
    pub fn get(&self, key: &str) -> &str {
        let lowered = key.to_lowercase();
        let (section, option) = match lowered.split_once("::") {
            Some((section, option)) => (section.to_string(), option.to_string()),
            None => (DEFAULT_SECTION.to_string(), lowered.clone()),
        };

        self.data
            .get(&section)
            .and_then(|options| options.get(&option))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn add_config(&mut self, section: &str, option: &str, value: &str) {
        let section = if section.is_empty() { DEFAULT_SECTION } else { section };
        self.data
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), value.to_string());
    }

    fn parse(&mut self, text: &str) -> Result<()> {
        let mut section = String::new();
        let mut multi_line = String::new();

        for (index, raw) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(DEFAULT_COMMENT) || line.starts_with(DEFAULT_COMMENT_SEM) {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                section = line[1..line.len() - 1].trim().to_lowercase();
                continue;
            }

            if line.ends_with(DEFAULT_MULTI_LINE_SEPARATOR) && line.len() > 1 {
                let part = line[..line.len() - 1].trim();
                if multi_line.is_empty() {
                    multi_line.push_str(part);
                } else {
                    multi_line.push(' ');
                    multi_line.push_str(part);
                }
                continue;
            }

            if multi_line.is_empty() {
                self.write(&section, line, line_number)?;
            } else {
                if !line.ends_with(DEFAULT_MULTI_LINE_SEPARATOR) {
                    multi_line.push(' ');
                    multi_line.push_str(line);
                }
                let joined = std::mem::take(&mut multi_line);
                self.write(&section, &joined, line_number)?;
            }
        }

        if !multi_line.is_empty() {
            let line_number = text.lines().count();
            let joined = std::mem::take(&mut multi_line);
            self.write(&section, &joined, line_number)?;
        }

        Ok(())
    }

    fn write(&mut self, section: &str, line: &str, line_number: usize) -> Result<()> {
        let Some((option, value)) = line.split_once('=') else {
            return Err(ModelError::Config {
                line: line_number,
                content: format!("{} = ?", line),
            }
            .into());
        };

        let option = option.trim();
        if option.is_empty() {
            return Err(ModelError::Config {
                line: line_number,
                content: format!("{} = ?", line),
            }
            .into());
        }

        self.add_config(section, &option.to_lowercase(), value.trim());
        Ok(())
    }
}
