//! Production-friendly observability hooks for provider calls, plugin dispatch,
//! and chat turns.
//!
//! ```rust
//! use pobserve::{MetricsObservabilityHooks, SafeTurnHooks, TracingObservabilityHooks};
//!
//! let _turn_hooks = SafeTurnHooks::new(TracingObservabilityHooks);
//! let _metrics = MetricsObservabilityHooks;
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeDispatchHooks, SafeProviderHooks, SafeTurnHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeDispatchHooks, SafeProviderHooks, SafeTurnHooks,
        TracingObservabilityHooks,
    };
}

#[cfg(test)]
mod tests;
