use std::path::Path;

use crate::error::Result;

/// Writes `content` to `path` as UTF-8, creating parent directories and
/// replacing any existing file.
pub async fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content.as_bytes()).await?;
    Ok(())
}
