//! Clipboard capability used to hand session codes and join links to the user.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{PeerGameError, Result};

/// Something that can place text where the user can paste it.
///
/// [`write_text`](Clipboard::write_text) is the primary path (an async
/// clipboard API); [`fallback_copy`](Clipboard::fallback_copy) is tried when
/// it fails (e.g. a hidden, selected textarea). The default fallback reports
/// failure.
#[async_trait]
pub trait Clipboard: Send + Sync + 'static {
    /// Copy `text` through the primary clipboard path.
    async fn write_text(&self, text: &str) -> Result<()>;

    async fn fallback_copy(&self, _text: &str) -> Result<()> {
        Err(PeerGameError::Clipboard(
            "no fallback copy available".into(),
        ))
    }
}

/// Copy `text`, trying the fallback if the primary path fails.
///
/// # Errors
///
/// Returns the fallback's error when both paths fail.
pub async fn copy_with_fallback(clipboard: &dyn Clipboard, text: &str) -> Result<()> {
    match clipboard.write_text(text).await {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("clipboard write failed ({e}), trying fallback copy");
            clipboard.fallback_copy(text).await
        }
    }
}
