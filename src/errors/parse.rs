use alloc::sync::Arc;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("Can't parse parameters of `{declaration}`: no parameter list found")]
    NoParameterList { declaration: Arc<str> },
    #[error("Can't parse parameters of `{declaration}`: `{parameter}` isn't a valid parameter name")]
    InvalidParameter { declaration: Arc<str>, parameter: Arc<str> },
}
