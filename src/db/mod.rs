pub mod memstore;
pub mod store;
