//! Staged audio files awaiting upload.

use std::path::{Path, PathBuf};

/// A synthesized audio file on disk, removed again when dropped.
///
/// The name embeds message id and sender id, so concurrent deliveries
/// for different messages never collide on a path.
#[derive(Debug)]
pub struct StagedAudio {
    path: PathBuf,
}

impl StagedAudio {
    /// Write `bytes` to the staging directory under the canonical name.
    pub async fn write(
        dir: &Path,
        message_id: i64,
        sender_id: i64,
        bytes: &[u8],
    ) -> std::io::Result<Self> {
        let path = dir.join(format!("audio_{message_id}_{sender_id}.ogg"));
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedAudio {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove staged audio"
                );
            }
        }
    }
}
