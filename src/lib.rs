//! Reply Scan — finds inbox threads that probably need a reply.

pub mod config;
pub mod error;
pub mod report;
pub mod scan;
pub mod scoring;
pub mod sources;
