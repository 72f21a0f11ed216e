//! Configuration options for emission, loading and execution.

/// Options for emitting a single method body.
///
/// # Example
///
/// ```
/// use jbcgen_core::options::EmitOptions;
///
/// let options = EmitOptions {
///     debug_info: false,
///     ..EmitOptions::default()
/// };
/// assert!(options.verify);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    /// Record local-variable and line-number tables.
    ///
    /// Default: true
    pub debug_info: bool,

    /// Run the verifier when a method is finished, so malformed bodies are
    /// reported by the emitter rather than at load time.
    ///
    /// Default: true
    pub verify: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            debug_info: true,
            verify: true,
        }
    }
}

/// Options for a [`ClassLoader`](crate::vm::ClassLoader).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Verify every method body when its class is defined.
    ///
    /// Default: true
    pub verify: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// Options for running code on the [`VM`](crate::vm::VM).
///
/// # Example
///
/// ```
/// use jbcgen_core::options::ExecutionOptions;
///
/// let options = ExecutionOptions { max_depth: 64 };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Maximum call depth.
    ///
    /// Default: 1000
    pub max_depth: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self { max_depth: 1000 }
    }
}
