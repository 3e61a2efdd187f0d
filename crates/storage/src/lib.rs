pub mod backend;
pub mod error;
pub mod fetcher;

pub use backend::build_s3_store;
pub use error::{Connectivity, FetchError};
pub use fetcher::{ObjectFetcher, ObjectStoreFetcher};
