pub mod registrar;
pub mod upload_store;
