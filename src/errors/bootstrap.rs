use alloc::sync::Arc;

use super::InvokeErrorKind;
use crate::module::HookPhase;

#[derive(thiserror::Error, Debug)]
pub enum BootstrapErrorKind {
    #[error("Module {module} is already bootstrapped")]
    AlreadyBootstrapped { module: Arc<str> },
    #[error("{phase} hook #{index} of module {module} failed: {error}")]
    Hook {
        module: Arc<str>,
        phase: HookPhase,
        index: usize,
        error: InvokeErrorKind,
    },
}
