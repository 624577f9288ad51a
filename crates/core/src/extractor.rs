use crate::error::IngestError;
use crate::models::DocumentKind;
use lopdf::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub pages: Vec<PageText>,
}

impl ExtractedDocument {
    pub fn has_text(&self) -> bool {
        self.pages.iter().any(|page| !page.text.trim().is_empty())
    }
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], file_name: &str) -> Result<ExtractedDocument, IngestError>;
}

/// PDFs are read page by page with lopdf; every other file is treated as
/// UTF-8 text on a single page.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExtractor;

impl TextExtractor for DefaultExtractor {
    fn extract(&self, bytes: &[u8], file_name: &str) -> Result<ExtractedDocument, IngestError> {
        let kind = DocumentKind::from_file_name(file_name);
        let pages = match kind {
            DocumentKind::Paged => extract_pdf_pages(bytes)?,
            DocumentKind::Text => vec![PageText {
                number: 1,
                text: String::from_utf8_lossy(bytes).into_owned(),
            }],
        };
        Ok(ExtractedDocument { kind, pages })
    }
}

pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
    let document =
        Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        match document.extract_text(&[page_no]) {
            Ok(text) if !text.trim().is_empty() => pages.push(PageText {
                number: page_no,
                text,
            }),
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(page = page_no, %error, "skipping unreadable pdf page");
            }
        }
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_files_are_a_single_first_page() {
        let extracted = DefaultExtractor
            .extract(b"line one\nline two", "notes.txt")
            .unwrap();
        assert_eq!(extracted.kind, DocumentKind::Text);
        assert_eq!(
            extracted.pages,
            vec![PageText {
                number: 1,
                text: "line one\nline two".to_string()
            }]
        );
        assert!(extracted.has_text());
    }

    #[test]
    fn whitespace_text_has_no_text() {
        let extracted = DefaultExtractor.extract(b"  \n\t ", "blank.md").unwrap();
        assert!(!extracted.has_text());
    }

    #[test]
    fn broken_pdf_is_a_parse_error() {
        let result = DefaultExtractor.extract(b"%PDF-1.4\n%broken", "broken.pdf");
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }
}
