//! File name filter.
//!
//! Decides whether a file is eligible for splitting. The pattern must match
//! the whole bare file name, never a substring or the directory part.
//!
//! # Example
//!
//! ```
//! use splitwire::FileFilter;
//!
//! let filter = FileFilter::new(r".*\.csv").unwrap();
//! assert!(filter.matches("part-0001.csv"));
//! assert!(!filter.matches("part-0001.tmp"));
//! ```

use std::path::Path;

use regex::Regex;

use crate::error::Result;

/// Compiled file name pattern.
#[derive(Debug, Clone)]
pub struct FileFilter {
    pattern: String,
    regex: Regex,
}

impl FileFilter {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` for a malformed regular expression.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self::compile(pattern)?)
    }

    /// Compile a pattern, keeping the raw regex error.
    pub fn compile(pattern: &str) -> std::result::Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as given.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a bare file name.
    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    /// Match the final component of a path. Paths without one never match.
    pub fn accepts_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.matches(name))
    }
}

/// One-shot match of `pattern` against a bare file name.
pub fn matches_file_name(pattern: &str, file_name: &str) -> Result<bool> {
    Ok(FileFilter::new(pattern)?.matches(file_name))
}
