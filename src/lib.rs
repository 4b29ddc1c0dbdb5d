//! In-memory key-value store with scalar, list and dict values, per-key
//! expiration, and a small JSON-over-HTTP front end.
//!
//! ```rust
//! use redislike::Store;
//!
//! let store = Store::new();
//! store.set("greeting", "hello");
//! store.push("queue", ["a", "b"]).unwrap();
//! store.hset("user:1", "name", "ada").unwrap();
//!
//! assert_eq!(store.get("greeting").unwrap(), "hello");
//! assert_eq!(store.pop("queue").unwrap(), "a");
//! assert_eq!(store.hget("user:1", "name").unwrap(), "ada");
//! ```

pub mod commands;
pub mod config;
pub mod db;
pub mod expiry;
pub mod parser;
pub mod server;
mod value;

pub use config::Config;
pub use db::{DbError, Store};
pub use server::serve;
