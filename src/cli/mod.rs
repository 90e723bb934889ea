pub mod commands;
pub mod progress;
pub mod ui;
pub mod util;

pub use progress::ConsoleReporter;
pub use util::{CommandContext, OutputFormat};
