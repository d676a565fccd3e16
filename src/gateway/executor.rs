//! Sandboxed executor - the only component that mutates the repository
//!
//! Every call confines its target first, computes new content in memory, and
//! persists it through a scratch file plus rename. Failures of any kind come
//! back as `ExecutionResult { ok: false, .. }`; nothing escapes `execute`.
//! A failed write leaves no scratch file and no newly created directories.

use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;

use super::confine::confine;
use super::patch;
use crate::config::ExecutorConfig;
use crate::domain::{ActionType, ExecutionResult};
use crate::error::{GatewayError, Result};
use crate::id::scratch_file_name;

/// Performs proposed actions under a repository root
#[derive(Debug, Clone)]
pub struct SandboxedExecutor {
    read_cap_bytes: u64,
}

impl SandboxedExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            read_cap_bytes: config.read_cap_bytes,
        }
    }

    /// Execute an action given its raw tag, as a proposer might emit it
    pub async fn execute_tagged(&self, tag: &str, target: &str, repo_root: &Path, payload: &str) -> ExecutionResult {
        match tag.parse::<ActionType>() {
            Ok(action) => self.execute(action, target, repo_root, payload).await,
            Err(e) => {
                log::warn!("Refusing unknown action tag '{}' for {}", tag, target);
                ExecutionResult::failure(tag, target, e.to_string())
            }
        }
    }

    /// Execute one action. Never fails; errors are reported in the result.
    pub async fn execute(&self, action: ActionType, target: &str, repo_root: &Path, payload: &str) -> ExecutionResult {
        let tag = action.as_str();
        match self.dispatch(action, target, repo_root, payload).await {
            Ok(content) => {
                tracing::debug!(action = tag, target, "action executed");
                let result = ExecutionResult::success(tag, target);
                match content {
                    Some(content) => result.with_content(content),
                    None => result,
                }
            }
            Err(e) => {
                tracing::info!(action = tag, target, error = %e, "action failed");
                ExecutionResult::failure(tag, target, e.to_string())
            }
        }
    }

    async fn dispatch(&self, action: ActionType, target: &str, repo_root: &Path, payload: &str) -> Result<Option<String>> {
        let path = confine(repo_root, target)?;

        // Covers the root itself ("." or "sub/..")
        if matches!(action, ActionType::WriteFile | ActionType::EditFile) && path.is_dir() {
            return Err(GatewayError::NotAFile {
                target: target.to_string(),
            });
        }

        match action {
            ActionType::OpenFile => self.open_file(&path).await.map(Some),
            ActionType::WriteFile => {
                let content = patch::apply(None, payload)?;
                let created = match path.parent() {
                    Some(parent) => create_parents(parent).await?,
                    None => Vec::new(),
                };
                if let Err(e) = write_atomic(&path, &content).await {
                    remove_created(&created).await;
                    return Err(e);
                }
                Ok(None)
            }
            ActionType::DeleteFile => {
                if !tokio::fs::try_exists(&path).await? || path.is_dir() {
                    return Err(GatewayError::file_missing(target));
                }
                tokio::fs::remove_file(&path).await?;
                Ok(None)
            }
            ActionType::EditFile => {
                if !path.is_file() {
                    return Err(GatewayError::edit_target_missing(target));
                }
                let content = if patch::is_diff_shaped(payload) {
                    let current = tokio::fs::read_to_string(&path).await?;
                    patch::apply(Some(&current), payload)?
                } else {
                    payload.to_string()
                };
                write_atomic(&path, &content).await?;
                Ok(None)
            }
            ActionType::Completed => Ok(None),
        }
    }

    async fn open_file(&self, path: &Path) -> Result<String> {
        let file = tokio::fs::File::open(path).await?;
        let mut bytes = Vec::new();
        file.take(self.read_cap_bytes).read_to_end(&mut bytes).await?;
        let capped = bytes.len() as u64 >= self.read_cap_bytes;

        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            // The cap split a multi-byte character; keep the valid prefix
            Err(e) if capped && e.utf8_error().error_len().is_none() => {
                let valid = e.utf8_error().valid_up_to();
                String::from_utf8_lossy(&e.as_bytes()[..valid]).into_owned()
            }
            Err(e) => {
                log::debug!("{} is not valid UTF-8, decoding as Latin-1", path.display());
                decode_latin1(e.as_bytes())
            }
        })
    }
}

impl Default for SandboxedExecutor {
    fn default() -> Self {
        Self::new(&ExecutorConfig::default())
    }
}

/// Map each byte to the code point of the same value
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Create the missing ancestors of `dir`, returning them deepest first
async fn create_parents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut missing = Vec::new();
    let mut current = Some(dir);
    while let Some(d) = current {
        if tokio::fs::try_exists(d).await? {
            break;
        }
        missing.push(d.to_path_buf());
        current = d.parent();
    }

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        remove_created(&missing).await;
        return Err(e.into());
    }
    Ok(missing)
}

async fn remove_created(dirs: &[PathBuf]) {
    for dir in dirs {
        if let Err(e) = tokio::fs::remove_dir(dir).await {
            log::debug!("Could not remove {}: {}", dir.display(), e);
        }
    }
}

/// Write through a hidden sibling and rename over the target
async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "target is not a file path"))?;
    let scratch = path.with_file_name(scratch_file_name(&file_name));

    let written = persist(&scratch, path, content).await;
    if written.is_err() {
        let _ = tokio::fs::remove_file(&scratch).await;
    }
    written
}

/// Fill `scratch`, carry over the permissions of an existing target, then swap it in
async fn persist(scratch: &Path, path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(scratch, content).await?;
    if let Ok(existing) = tokio::fs::metadata(path).await {
        tokio::fs::set_permissions(scratch, existing.permissions()).await?;
    }
    tokio::fs::rename(scratch, path).await?;
    Ok(())
}
