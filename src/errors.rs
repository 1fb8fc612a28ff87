mod bootstrap;
mod instantiate;
mod invoke;
mod parse;
mod resolve;
mod validation;

pub use bootstrap::BootstrapErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use invoke::InvokeErrorKind;
pub use parse::ParseErrorKind;
pub use resolve::ResolveErrorKind;
pub use validation::ValidationErrorKind;
