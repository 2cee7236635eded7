pub mod compiler;
pub mod result;
pub mod runner;
pub mod testcase;

pub use compiler::*;
pub use result::*;
pub use runner::*;
pub use testcase::*;

#[cfg(all(test, unix))]
pub(crate) mod sandbox;
