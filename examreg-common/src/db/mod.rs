//! Database access shared by the examreg binaries

pub mod init;
pub mod models;

pub use init::{connect, init_database};
