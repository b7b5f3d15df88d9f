//! Dataset Loader: one entry point, two acquisition modes.

pub mod fixture;
pub mod upload;

use crate::domain::dataset::Dataset;
use crate::error::Result;
use std::sync::Arc;

pub use fixture::fixture_dataset;

#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Raw bytes of an uploaded CSV file.
    Upload(&'a [u8]),
    /// The built-in ten-row fixture. Never fails.
    Fixture,
}

pub fn load(source: Source<'_>) -> Result<Arc<Dataset>> {
    match source {
        Source::Upload(bytes) => {
            let dataset = upload::parse_csv(bytes)?;
            tracing::info!(
                bytes = bytes.len(),
                records = dataset.len(),
                columns = dataset.columns().len(),
                "loaded uploaded dataset"
            );
            Ok(Arc::new(dataset))
        }
        Source::Fixture => Ok(fixture::shared()),
    }
}
