//! `attachsift`: sort email attachments into referenced and decorative.
//!
//! This crate extracts the HTML body and candidate attachment ids from
//! archived messages, asks a language model which attachments the body
//! actually refers to, repairs the answer into a valid partition, and
//! scores predictions against ground truth.

pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod eval;
pub mod model;
pub mod parser;
pub mod store;
