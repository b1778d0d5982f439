/// Errors that can occur while persisting a session
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// PNG encoding error
    #[cfg(feature = "charts")]
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// PDF rendering error
    #[error("PDF error: {0}")]
    Pdf(String),

    /// A staged artifact could not be moved into place
    #[error("Failed to commit {}: {source}", .path.display())]
    Commit {
        /// Destination path
        path: std::path::PathBuf,
        /// Underlying rename error
        source: std::io::Error,
    },

    /// A CSV log did not match the expected layout
    #[error("Invalid log: {0}")]
    InvalidLog(String),
}
