use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info};

use super::compositor::PolaroidSession;
use super::error::ApplicationError;
use crate::domain::caption_source_trait::CaptionSource;

/// Shown in place of the caption when the round trip fails.
pub const CAPTION_FALLBACK: &str = "Maaf, terjadi kesalahan.";

/// Allows one caption request at a time, like a button disabled while it runs.
#[derive(Debug, Default)]
pub struct CaptionTrigger {
    busy: AtomicBool,
}

pub struct TriggerGuard<'a> {
    trigger: &'a CaptionTrigger,
}

impl CaptionTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<TriggerGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TriggerGuard { trigger: self })
    }
}

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        self.trigger.busy.store(false, Ordering::Release);
    }
}

/// Clears the caption, streams a new one into the session fragment by
/// fragment, and falls back to [`CAPTION_FALLBACK`] on any failure.
pub async fn generate_caption<S: CaptionSource>(
    session: &mut PolaroidSession,
    source: &S,
    trigger: &CaptionTrigger,
    language: &str,
) -> Result<String, ApplicationError> {
    let _guard = trigger.try_acquire().ok_or(ApplicationError::CaptionInFlight)?;

    let request = match session.caption_upload(language) {
        Ok(request) => request,
        Err(ApplicationError::NoImageLoaded) => return Err(ApplicationError::NoImageLoaded),
        Err(err) => {
            error!("Error preparing caption request: {}", err);
            session.caption_changed(CAPTION_FALLBACK);
            return Err(err);
        }
    };

    session.caption_changed(String::new());
    let streamed = source
        .stream_caption(&request, |text| {
            session.append_caption(text);
        })
        .await;

    match streamed {
        Ok(()) => {
            info!("Caption received ({} chars)", session.caption().chars().count());
            Ok(session.caption().to_string())
        }
        Err(err) => {
            error!("Error generating caption: {}", err);
            session.caption_changed(CAPTION_FALLBACK);
            Err(err.into())
        }
    }
}
