use thiserror::Error;

/// Errors reported by registry operations.
///
/// A lookup miss is not an error: [`Registry::lookup`](crate::Registry::lookup)
/// returns `None`. Only the typed accessors turn absence into `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Nothing is registered under the requested name.
    #[error("no global registered under `{name}`")]
    NotFound { name: String },

    /// The name is registered with a different concrete type.
    #[error("global `{name}` holds a `{stored}`, not a `{requested}`")]
    TypeMismatch {
        name: String,
        stored: &'static str,
        requested: &'static str,
    },

    /// The registry uses [`ReplacePolicy::Reject`](crate::ReplacePolicy::Reject)
    /// and the name is taken.
    #[error("global `{name}` is already registered")]
    AlreadyRegistered { name: String },
}
