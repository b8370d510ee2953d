mod completion;
mod editor;
mod keys;
mod terminal;

pub use editor::{LineEditor, ReadOutcome};
pub use terminal::{RawMode, TerminalInput};
