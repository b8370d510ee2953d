mod builtins;
#[allow(clippy::module_inception)]
mod executor;
pub(super) mod streams;

pub use builtins::{Builtin, Flow};
pub use executor::Executor;
