//! Terminal timer that keeps count of how long you spend on each website
//! domain. Point a session at a domain, leave the overlay in a corner of the
//! terminal, and the accumulated time survives restarts, suspensions, and
//! several sessions sharing one state file.
//!

pub mod cli;
pub mod session;
pub mod storage;
pub mod utils;
