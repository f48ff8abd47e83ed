//! Text extraction for the supported upload formats

use crate::error::{Error, Result};

/// Plain text MIME type
pub const TEXT_PLAIN: &str = "text/plain";
/// PDF MIME type
pub const APPLICATION_PDF: &str = "application/pdf";
/// DOCX MIME type
pub const APPLICATION_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// UTF-8 plain text
    Text,
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
}

impl FileKind {
    /// Resolve a MIME type, ignoring parameters such as `charset`
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            TEXT_PLAIN => Some(Self::Text),
            APPLICATION_PDF => Some(Self::Pdf),
            APPLICATION_DOCX => Some(Self::Docx),
            _ => None,
        }
    }
}

/// Content-type driven text extractor
pub struct FileParser;

impl FileParser {
    /// Extract the text of an uploaded file
    pub fn extract_text(filename: &str, content_type: &str, data: &[u8]) -> Result<String> {
        let kind = FileKind::from_content_type(content_type)
            .ok_or_else(|| Error::UnsupportedContentType(content_type.to_string()))?;

        match kind {
            FileKind::Text => Self::parse_text(filename, data),
            FileKind::Pdf => Self::parse_pdf(filename, data),
            FileKind::Docx => Self::parse_docx(filename, data),
        }
    }

    /// Parse plain text; invalid UTF-8 is an error, not replaced
    fn parse_text(filename: &str, data: &[u8]) -> Result<String> {
        std::str::from_utf8(data)
            .map(str::to_string)
            .map_err(|e| Error::file_parse(filename, e.to_string()))
    }

    /// Parse PDF document
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<String> {
        // pdf-extract panics on some malformed files instead of returning an error
        let content = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data))
            .map_err(|_| Error::file_parse(filename, "PDF parser panicked"))?
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        // pdf-extract leaves NULs behind for some embedded fonts
        Ok(content.replace('\0', ""))
    }

    /// Parse DOCX document, joining paragraph texts with a space
    fn parse_docx(filename: &str, data: &[u8]) -> Result<String> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                paragraphs.push(text);
            }
        }

        Ok(paragraphs.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_resolution() {
        assert_eq!(FileKind::from_content_type("text/plain"), Some(FileKind::Text));
        assert_eq!(
            FileKind::from_content_type("text/plain; charset=utf-8"),
            Some(FileKind::Text)
        );
        assert_eq!(FileKind::from_content_type("Application/PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_content_type(APPLICATION_DOCX), Some(FileKind::Docx));
        assert_eq!(FileKind::from_content_type("image/png"), None);
    }

    #[test]
    fn test_plain_text() {
        let text = FileParser::extract_text("a.txt", TEXT_PLAIN, b"Hello world.").unwrap();
        assert_eq!(text, "Hello world.");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = FileParser::extract_text("a.txt", TEXT_PLAIN, &[0x48, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::FileParse { ref filename, .. } if filename == "a.txt"));
    }

    #[test]
    fn test_unsupported_content_type() {
        let err = FileParser::extract_text("a.png", "image/png", &[0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedContentType(ref t) if t == "image/png"));
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let err = FileParser::extract_text("a.pdf", APPLICATION_PDF, b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_docx_paragraphs_joined_with_space() {
        let mut buf = std::io::Cursor::new(Vec::new());
        docx_rs::Docx::new()
            .add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text("First paragraph.")))
            .add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text("Second one.")))
            .build()
            .pack(&mut buf)
            .unwrap();

        let text = FileParser::extract_text("a.docx", APPLICATION_DOCX, buf.get_ref()).unwrap();
        assert_eq!(text, "First paragraph. Second one.");
    }
}
