/// Config for a module
/// ## Fields
/// - `permissive_names`:
///   If `true`, the module name may start with a single underscore (`_core`).
///
///   This does **not** affect service names, which always accept a leading underscore.
#[derive(Clone, Copy, Default)]
#[cfg_attr(feature = "debug", derive(Debug))]
pub struct Config {
    pub permissive_names: bool,
}
