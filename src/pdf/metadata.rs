//! PDF metadata extraction

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};

/// Basic facts about a PDF
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages found by walking the page tree
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Producing application (if present)
    pub producer: Option<String>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    let doc = load_existing(path)?;
    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| match info {
            Object::Reference(id) => doc.get_object(*id).ok(),
            direct => Some(direct),
        })
        .and_then(|info| info.as_dict().ok());

    let text_field = |key: &[u8]| {
        info.and_then(|dict| dict.get(key).ok())
            .and_then(|value| value.as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    };

    Ok(PdfMetadata {
        page_count,
        title: text_field(b"Title"),
        producer: text_field(b"Producer"),
    })
}

/// Count the pages of a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    let doc = load_existing(path)?;
    match doc.get_pages().len() {
        0 => Err(Error::EmptyPdf(path.to_path_buf())),
        n => Ok(n),
    }
}

fn load_existing(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(Document::load(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::create::{write_overlay_pdf, OverlayOptions};
    use tempfile::TempDir;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_count_pages_of_overlay() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overlay.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        write_overlay_pdf(
            &OverlayOptions {
                text: "x".to_string(),
                ..Default::default()
            },
            &mut file,
        )
        .unwrap();
        drop(file);

        assert_eq!(count_pages(&path).unwrap(), 1);
        let meta = extract_metadata(&path).unwrap();
        assert_eq!(meta.page_count, 1);
        assert!(meta.title.is_none());
    }
}
