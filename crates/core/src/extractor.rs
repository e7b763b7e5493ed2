use crate::error::IngestError;
use lopdf::Document;

pub const SUPPORTED_MEDIA_TYPE: &str = "application/pdf";

/// Reject anything the pipeline cannot extract before it reaches the core.
pub fn ensure_supported(media_type: &str) -> Result<(), IngestError> {
    if media_type.trim().eq_ignore_ascii_case(SUPPORTED_MEDIA_TYPE) {
        Ok(())
    } else {
        Err(IngestError::UnsupportedFormat(media_type.to_string()))
    }
}

pub trait PdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let document = Document::load_mem(bytes)
            .map_err(|error| IngestError::ExtractionFailed(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::ExtractionFailed(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(text);
            }
        }

        if pages.is_empty() {
            return Err(IngestError::ExtractionFailed(
                "pdf had no readable page text".to_string(),
            ));
        }

        Ok(pages.join("\n"))
    }
}
