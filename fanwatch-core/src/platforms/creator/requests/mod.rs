pub mod account;
pub mod follow;
pub mod stream;
pub mod timeline;
