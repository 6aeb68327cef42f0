//! Core data model types: attachment ids, extracted messages, and partitions.

pub mod attachment;
pub mod message;
pub mod partition;
