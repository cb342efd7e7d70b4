// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem job kinds, bounded by a root prefix.

use crate::executor::ExecError;
use sheratan_core::ResultAction;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Executes `list_files`/`read_file`/`write_file` under a fixed root.
/// Paths that are absolute or climb out with `..` are refused.
#[derive(Debug, Clone)]
pub struct FileExecutor {
    root: PathBuf,
}

impl FileExecutor {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_owned() }
    }

    pub fn list_files(&self, raw: &str) -> Result<ResultAction, ExecError> {
        let dir = self.resolve(raw)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();
        Ok(ResultAction::ListFilesResult { path: raw.to_string(), entries })
    }

    pub fn read_file(&self, raw: &str) -> Result<ResultAction, ExecError> {
        let path = self.resolve(raw)?;
        let content = fs::read_to_string(&path)?;
        Ok(ResultAction::ReadFileResult { path: raw.to_string(), content })
    }

    pub fn write_file(&self, raw: &str, content: &str) -> Result<ResultAction, ExecError> {
        let path = self.resolve(raw)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(ResultAction::WriteFile {
            path: raw.to_string(),
            bytes_written: content.len() as u64,
        })
    }

    /// Resolve a job-supplied path inside the root. Lexical containment:
    /// no absolute paths, no `..` components.
    fn resolve(&self, raw: &str) -> Result<PathBuf, ExecError> {
        let candidate = Path::new(raw);
        if candidate.is_absolute() {
            return Err(ExecError::Validation(format!("absolute path refused: {raw}")));
        }
        for component in candidate.components() {
            match component {
                Component::ParentDir => {
                    return Err(ExecError::Validation(format!("path escapes root: {raw}")))
                }
                Component::Prefix(_) | Component::RootDir => {
                    return Err(ExecError::Validation(format!("absolute path refused: {raw}")))
                }
                _ => {}
            }
        }
        Ok(self.root.join(candidate))
    }
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
