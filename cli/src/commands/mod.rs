//! CLI command implementations

pub mod interactive;
pub mod script;

pub use interactive::interactive_command;
pub use script::script_command;
