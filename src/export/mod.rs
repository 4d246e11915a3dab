//! Report exporters.
//!
//! All three renderers walk the same [`ReportDocument`](crate::document::ReportDocument)
//! section list and are responsible for layout only. An export failure is
//! fatal to that one export action; the caller may retry.

pub mod pdf;
pub mod text;
pub mod xlsx;

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("pdf generation failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("spreadsheet generation failed: {0}")]
    Xlsx(#[from] xlsxwriter::XlsxError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid output path: {0}")]
    Path(String),
}

/// `{dir}/{file_stem}.{ext}`, e.g. `reports/Order_Report_1042.pdf`.
pub fn output_path(dir: &Path, file_stem: &str, ext: &str) -> PathBuf {
    dir.join(format!("{file_stem}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_naming() {
        let path = output_path(Path::new("/tmp/reports"), "Order_Report_1042", "pdf");
        assert_eq!(
            path,
            PathBuf::from("/tmp/reports/Order_Report_1042.pdf")
        );
    }
}
