//! Course cache library
//!
//! A versioned, TTL-bounded cache for slow-changing course-review reference
//! data (professors, majors, term timetables) over a pluggable key-value store.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod origin;
pub mod store;
