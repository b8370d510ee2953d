pub mod error;
mod executor;
mod history;
mod parser;
mod readline;
mod session;
#[allow(clippy::module_inception)]
mod shell;

pub use shell::Shell;
