//! Cross-process directory locking: primitive, retry driver, scoped guard.

pub mod driver;
pub mod guard;
pub mod primitive;
