//! Read accessors over a finished run's output namespace.
//!
//! Nothing here writes back into the run. Every accessor returns `None`
//! when its branch is absent, so optional stages need no special casing.

mod accessors;
pub mod dhva;
pub mod download;
pub mod wout;

pub use accessors::{
    BandPair, CentersSpreadsRow, CentersSpreadsTable, IsosurfaceBundle, SpreadSummary, TableColumn, Wannier90Results,
};
pub use dhva::{DhvaFrequencies, FrequencySeries, RotationAxis};
pub use download::{data_uri, download_links, DownloadKind, DownloadLink};
pub use wout::{parse_wout, ConvergenceHistory};
