//! Purpose: Core domain modules for the blog collection.
//! Exports: `entry`, `error`, `store`.
//! Role: Everything below the HTTP/CLI surfaces lives here.
pub mod entry;
pub mod error;
pub mod store;
