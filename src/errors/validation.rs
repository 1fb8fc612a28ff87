use alloc::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Invalid module name {name}. Module name must match {grammar}")]
    InvalidModuleName { name: Arc<str>, grammar: &'static str },
    #[error("Can't register {kind} in {module} with name {name}. Service name must match {grammar}")]
    InvalidServiceName {
        module: Arc<str>,
        kind: &'static str,
        name: Arc<str>,
        grammar: &'static str,
    },
    #[error("Can't register {kind} injectable in {module}: {reason}")]
    InvalidInjectable { module: Arc<str>, kind: &'static str, reason: &'static str },
    #[error("Can't register {kind} in {module}, the module is already bootstrapped")]
    Bootstrapped { module: Arc<str>, kind: &'static str },
}
