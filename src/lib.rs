#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod bag;
pub(crate) mod call;
pub(crate) mod callable;
pub(crate) mod config;
pub(crate) mod errors;
pub(crate) mod injectable;
pub(crate) mod injector;
pub(crate) mod lift;
pub(crate) mod locals;
pub(crate) mod module;
pub(crate) mod params;
pub(crate) mod provider;

pub mod names;

pub use any::{value, AnyService, TypeInfo};
pub use call::Call;
pub use config::Config;
pub use errors::{
    BootstrapErrorKind, InstantiateErrorKind, InvokeErrorKind, ParseErrorKind, ResolveErrorKind, ValidationErrorKind,
};
pub use injectable::Injectable;
pub use injector::Injector;
pub use lift::Lifted;
pub use locals::Locals;
pub use module::{module, HookPhase, Module, ModuleId};
pub use names::{is_module_name, is_service_name};
pub use params::parse_parameter_names;
pub use provider::{FactoryProvider, Methods, ProviderClass, ServiceClass, ServiceProvider};
