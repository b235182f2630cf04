pub mod directory;
pub mod documents;
pub mod invites;
pub mod notes;
pub mod ping;
