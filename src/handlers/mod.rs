pub mod customers;
pub mod documents;
pub mod notes;
pub mod ping;
pub mod profile;
