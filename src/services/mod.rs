pub mod credential_store;
pub mod dashboard;
pub mod file_processor;
pub mod session;
pub mod table;
