//! Retrieved files as downloadable `data:` URIs.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a retrieved file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
    /// `*_tb.dat` tight-binding model.
    TightBindingModel,
    /// `*.bxsf` Fermi surface.
    FermiSurface,
    /// `*.xsf` Wannier function.
    WannierFunction,
}

impl DownloadKind {
    /// Classifies a file name; other files are not offered.
    #[must_use]
    pub fn of(filename: &str) -> Option<Self> {
        if filename.ends_with("_tb.dat") {
            Some(Self::TightBindingModel)
        } else if filename.ends_with(".bxsf") {
            Some(Self::FermiSurface)
        } else if filename.ends_with(".xsf") {
            Some(Self::WannierFunction)
        } else {
            None
        }
    }

    fn describe(self, filename: &str) -> String {
        match self {
            Self::TightBindingModel => format!("Download the tight-binding model {filename}"),
            Self::FermiSurface => format!("Download the Fermi surface {filename}"),
            Self::WannierFunction => format!("Download the Wannier function file {filename}"),
        }
    }
}

/// A file rendered for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    /// File name offered to the browser.
    pub filename: String,
    /// What the file is.
    pub kind: DownloadKind,
    /// Link text.
    pub description: String,
    /// `data:application/octet-stream;base64,...`.
    pub payload: String,
}

/// Encodes bytes as an octet-stream `data:` URI.
#[must_use]
pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:application/octet-stream;base64,{}", STANDARD.encode(bytes))
}

/// Returns the offered files of a `{filename: contents}` object, by name.
#[must_use]
pub fn download_links(retrieved: &Value) -> Vec<DownloadLink> {
    let Some(files) = retrieved.as_object() else {
        return Vec::new();
    };
    let mut links: Vec<DownloadLink> = files
        .iter()
        .filter_map(|(filename, contents)| {
            let kind = DownloadKind::of(filename)?;
            let contents = contents.as_str()?;
            Some(DownloadLink {
                filename: filename.clone(),
                kind,
                description: kind.describe(filename),
                payload: data_uri(contents.as_bytes()),
            })
        })
        .collect();
    links.sort_by(|a, b| a.filename.cmp(&b.filename));
    links
}
