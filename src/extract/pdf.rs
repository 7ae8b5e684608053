use std::panic::{self, AssertUnwindSafe};

/// Text layer of every page in order, trimmed. Corrupt or image-only
/// documents come back empty.
pub fn extract_text(bytes: &[u8]) -> String {
    // pdf-extract panics on some malformed inputs
    let out = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));
    match out {
        Ok(Ok(text)) => text.trim().to_string(),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "pdf extraction failed");
            String::new()
        }
        Err(_) => {
            tracing::warn!("pdf extraction panicked");
            String::new()
        }
    }
}
