use super::{InstantiateErrorKind, ResolveErrorKind};

#[derive(thiserror::Error, Debug)]
pub enum InvokeErrorKind {
    /// The injectable couldn't be normalized or one of its dependencies couldn't be resolved
    #[error(transparent)]
    Deps(#[from] ResolveErrorKind),
    /// The target itself returned an error
    #[error(transparent)]
    Call(#[from] InstantiateErrorKind),
}
