//! # Runtime Module
//!
//! Process runtime for the controller: initialization, the watch loop and the error
//! policy applied to failed reconciliations.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;
