//! Command line front end.

pub mod app;
pub mod logger;
#[cfg(feature = "reqwest")]
mod run;

pub use self::app::{App, Commands};
#[cfg(feature = "reqwest")]
pub use self::run::run;
