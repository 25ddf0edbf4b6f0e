//! Storage-media detection and the locking policy derived from it.

pub mod devtree;
pub mod policy;
pub mod rotational;
