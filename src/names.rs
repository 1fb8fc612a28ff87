//! Name grammars and reserved names.

/// Name under which every injector resolves itself.
pub const INJECTOR: &str = "$injector";
/// Local holding the name of the service whose provider is running `$get`.
pub const NAME: &str = "$name";
/// Suffix that turns a service lookup into a provider lookup.
pub const PROVIDER_SUFFIX: &str = "Provider";

pub const MODULE_NAME_GRAMMAR: &str = "^[A-Za-z][A-Za-z0-9_-]*$";
pub const PERMISSIVE_MODULE_NAME_GRAMMAR: &str = "^_?[A-Za-z][A-Za-z0-9_-]*$";
pub const SERVICE_NAME_GRAMMAR: &str = "^[A-Za-z_][A-Za-z0-9_]*$ (not ending with `Provider`)";

#[inline]
fn is_module_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[inline]
pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Checks `name` against [`MODULE_NAME_GRAMMAR`].
#[must_use]
pub fn is_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic()) && chars.all(is_module_char)
}

/// Checks `name` against [`PERMISSIVE_MODULE_NAME_GRAMMAR`].
#[must_use]
pub fn is_permissive_module_name(name: &str) -> bool {
    is_module_name(name.strip_prefix('_').unwrap_or(name))
}

/// Checks `name` against [`SERVICE_NAME_GRAMMAR`].
///
/// Names ending with [`PROVIDER_SUFFIX`] are rejected, because `xProvider` always addresses the provider of `x`.
#[must_use]
pub fn is_service_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if is_identifier_start(c)) && chars.all(is_identifier_char) && !name.ends_with(PROVIDER_SUFFIX)
}

/// A name a callable may declare: a service name, a reserved `$`-name, a local or a provider request.
#[must_use]
pub(crate) fn is_parameter_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if is_identifier_start(c) || c == '$') && chars.all(|c| is_identifier_char(c) || c == '$')
}

/// Returns the service name addressed by a `xProvider` request.
#[must_use]
pub(crate) fn provider_stem(name: &str) -> Option<&str> {
    name.strip_suffix(PROVIDER_SUFFIX).filter(|stem| !stem.is_empty())
}

/// Splits a `service:method` reference.
#[must_use]
pub(crate) fn split_method_ref(reference: &str) -> Option<(&str, &str)> {
    let (service, method) = reference.split_once(':')?;
    let mut chars = service.chars();
    let service_ok = matches!(chars.next(), Some(c) if is_identifier_start(c)) && chars.all(is_identifier_char);
    (service_ok && !method.is_empty() && !method.contains(':')).then_some((service, method))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_names() {
        assert!(is_module_name("m1"));
        assert!(is_module_name("core-http_v2"));
        assert!(!is_module_name(""));
        assert!(!is_module_name("1m"));
        assert!(!is_module_name("a.b"));
        assert!(!is_module_name("a:b"));
        assert!(!is_module_name("_core"));

        assert!(is_permissive_module_name("_core"));
        assert!(is_permissive_module_name("core"));
        assert!(!is_permissive_module_name("__core"));
    }

    #[test]
    fn test_service_names() {
        assert!(is_service_name("s1"));
        assert!(is_service_name("_private"));
        assert!(!is_service_name("s-1"));
        assert!(!is_service_name("a.b"));
        assert!(!is_service_name("s3:addService"));
        assert!(!is_service_name("httpProvider"));
        assert!(!is_service_name("Provider"));
        assert!(!is_service_name("$injector"));
    }

    #[test]
    fn test_provider_stem() {
        assert_eq!(provider_stem("s1Provider"), Some("s1"));
        assert_eq!(provider_stem("Provider"), None);
        assert_eq!(provider_stem("s1"), None);
    }

    #[test]
    fn test_split_method_ref() {
        assert_eq!(split_method_ref("s3:addService"), Some(("s3", "addService")));
        assert_eq!(split_method_ref("s3:"), None);
        assert_eq!(split_method_ref(":getValue"), None);
        assert_eq!(split_method_ref("s3:a:b"), None);
        assert_eq!(split_method_ref("3s:getValue"), None);
        assert_eq!(split_method_ref("s3"), None);
    }

    #[test]
    fn test_parameter_names() {
        assert!(is_parameter_name("$injector"));
        assert!(is_parameter_name("s1Provider"));
        assert!(is_parameter_name("_"));
        assert!(!is_parameter_name("1a"));
        assert!(!is_parameter_name("&a"));
    }
}
