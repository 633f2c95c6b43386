//! Core engine — session bookkeeping and event dispatch.

pub mod agent;
pub mod clock;
pub mod driver;
pub mod session;
