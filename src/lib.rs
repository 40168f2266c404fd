/// ZVIEW-compatible command interpreter for FITS images, with object finding
/// and photometric reports.

pub mod analysis;
pub mod buffers;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod formats;
pub mod image;
pub mod logging;
pub mod report;
pub mod shell;
pub mod transcript;
pub mod viewers;
pub mod wcs;
pub mod zview;

#[cfg(test)]
mod test_utils;

pub use analysis::{Candidate, ObjectFinder};
pub use config::Settings;
pub use error::ZViewError;
pub use report::Report;
pub use zview::{Reply, Status, ZView};
