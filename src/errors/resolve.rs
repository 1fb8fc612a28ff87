use alloc::{boxed::Box, sync::Arc};

use super::{InstantiateErrorKind, InvokeErrorKind, ParseErrorKind};
use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Can't load service with name {name}")]
    NoService { name: Arc<str> },
    #[error("Cyclic dependency detected while building {name}")]
    CyclicDependency { name: Arc<str> },
    #[error("Method $get of {name} provider must return a valid service, got nothing")]
    AbsentService { name: Arc<str> },
    #[error("Incorrect type of {name}. Expected: {}", expected.name)]
    IncorrectType { name: Arc<str>, expected: TypeInfo },
    #[error("No argument at position {index}, the callable received {len}")]
    NoArgument { index: usize, len: usize },
    #[error("Invalid injectable {injectable}: {reason}")]
    InvalidInjectable { injectable: Arc<str>, reason: &'static str },
    #[error("Invalid serviceMethod injectable {service}:{method}. No method {method} found in service {service}")]
    NoMethod { service: Arc<str>, method: Arc<str> },
    #[error(transparent)]
    Parse(#[from] ParseErrorKind),
    #[error("Provider of {name} can't be constructed: {error}")]
    Provider { name: Arc<str>, error: Box<InstantiateErrorKind> },
    #[error("Method $get of {name} provider failed: {error}")]
    Get { name: Arc<str>, error: Box<InvokeErrorKind> },
}
