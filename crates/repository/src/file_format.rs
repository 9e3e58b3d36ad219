//! Mapping from page file names to repository file formats.

/// File format a stored document is filed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Text,
    Image,
    Word,
    Excel,
    PowerPoint,
    RichText,
    Pdf,
    Html,
    Avi,
    Wav,
    Pcl,
    Xml,
    OutlookMessage,
    Email,
    Archive,
}

impl FileFormat {
    /// Numeric file type id used by the repository.
    pub fn id(&self) -> i64 {
        match self {
            Self::Text => 1,
            Self::Image => 2,
            Self::Word => 12,
            Self::Excel => 13,
            Self::PowerPoint => 14,
            Self::RichText => 15,
            Self::Pdf => 16,
            Self::Html => 17,
            Self::Avi => 18,
            Self::Wav => 20,
            Self::Pcl => 21,
            Self::Xml => 32,
            Self::OutlookMessage => 35,
            Self::Email => 63,
            Self::Archive => 70,
        }
    }

    /// Resolve a format from a file extension, with or without the leading dot.
    ///
    /// Unknown extensions fall back to [`FileFormat::Image`].
    pub fn from_extension(extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "rda" => Self::Text,
            "bmp" | "gif" | "jpg" | "jpeg" | "tif" | "tiff" | "ico" | "png" => Self::Image,
            "doc" | "docx" => Self::Word,
            "xls" | "xlsx" | "xlsm" | "xlsb" | "csv" => Self::Excel,
            "ppt" | "pptx" => Self::PowerPoint,
            "rtf" => Self::RichText,
            "pdf" => Self::Pdf,
            "htm" | "html" | "mht" => Self::Html,
            "avi" => Self::Avi,
            "wav" => Self::Wav,
            "pcl" => Self::Pcl,
            "xml" => Self::Xml,
            "msg" => Self::OutlookMessage,
            "eml" => Self::Email,
            "rar" | "7z" | "bin" | "zip" => Self::Archive,
            _ => Self::Image,
        }
    }

    /// Pick the format for a document made of `page_names`.
    ///
    /// Multi-page documents are always images; a single page is resolved
    /// from its extension.
    pub fn for_pages<S: AsRef<str>>(page_names: &[S]) -> Self {
        match page_names {
            [single] => Self::from_extension(extension_of(single.as_ref())),
            _ => Self::Image,
        }
    }
}

fn extension_of(file_name: &str) -> &str {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
}
