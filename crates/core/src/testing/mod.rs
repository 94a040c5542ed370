//! Mock implementations of the external collaborators, for tests.

mod mock_index;
mod mock_metadata;

pub use mock_index::MockSearchIndex;
pub use mock_metadata::{MockMetadataProvider, RecordedLookup};
