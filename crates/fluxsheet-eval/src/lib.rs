pub mod builtins;
pub mod error_handler;
pub mod function_registry;
pub mod pipeline;
pub mod term;

pub use error_handler::ErrorHandler;
pub use function_registry::SheetFunction;
pub use pipeline::Runner;
pub use term::Term;
