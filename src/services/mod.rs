pub mod blob_store;
pub mod deleter;
pub mod processing;
pub mod status_table;
pub mod sync;
pub mod uploader;
