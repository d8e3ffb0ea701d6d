pub mod error;
pub mod pg_storage;
pub mod providers;
pub mod storage;

pub use error::StoreError;
pub use pg_storage::PgStorage;
pub use storage::Storage;
