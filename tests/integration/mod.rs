//! Integration test modules for tandem

pub mod config;
pub mod late_join;
pub mod looping;
pub mod poll_loop;
pub mod tempo;
