//! Integration tests: full negotiation sessions driven through the
//! public agent API and the line-based driver.

mod common;
mod driver;
mod session_flow;
