//! Library surface of the dadac command-line driver.

pub mod cli;
pub mod logging;
