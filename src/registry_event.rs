/// Events emitted by a registry during operations.
///
/// These events are passed to the tracing callback set via
/// [`Registry::set_trace_callback`](crate::Registry::set_trace_callback).
///
/// # Examples
///
/// ```rust
/// use singleton_index::RegistryEvent;
///
/// let event = RegistryEvent::Lookup { name: "app.config".into(), found: false };
/// assert_eq!(event.to_string(), "lookup { name: app.config, found: false }");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A name was looked up.
    Lookup { name: String, found: bool },

    /// An object was registered explicitly.
    Register {
        name: String,
        type_name: &'static str,
        /// Whether a previous entry under the same name was displaced.
        replaced: bool,
    },

    /// The lazy factory constructed a new instance.
    Create {
        name: String,
        type_name: &'static str,
    },

    /// The registry released all of its entries.
    Teardown { released: usize },
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Lookup { name, found } => {
                write!(f, "lookup {{ name: {name}, found: {found} }}")
            }
            RegistryEvent::Register {
                name,
                type_name,
                replaced,
            } => write!(
                f,
                "register {{ name: {name}, type_name: {type_name}, replaced: {replaced} }}"
            ),
            RegistryEvent::Create { name, type_name } => {
                write!(f, "create {{ name: {name}, type_name: {type_name} }}")
            }
            RegistryEvent::Teardown { released } => {
                write!(f, "teardown {{ released: {released} }}")
            }
        }
    }
}

/// Type alias for the user-supplied tracing callback.
pub type TraceCallback = dyn Fn(&RegistryEvent) + Send + Sync + 'static;
