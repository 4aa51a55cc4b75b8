//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator — token validation, user resolution
//! 2. Access logger — logs after auth, has the caller

pub mod auth;
pub mod log;
