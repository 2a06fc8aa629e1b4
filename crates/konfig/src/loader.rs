//! The binder: sources in, root proxy out.

use std::sync::Arc;

use tracing::debug;

use crate::contract::Contract;
use crate::error::BindError;
use crate::merge::merge_sources;
use crate::proxy::ConfigProxy;
use crate::source::SourceProvider;

/// Loads layered configuration and binds contracts to it.
///
/// A binder wraps one [`SourceProvider`]; each [`load`](Binder::load) call
/// re-reads the provider, merges defaults and the selected override into a
/// fresh tree, and hands out an independent root proxy.
///
/// # Example
///
/// ```
/// use konfig::{Binder, Contract, Operation, PropertyStore, ReturnShape, ScalarType, StaticSources};
///
/// let sources = StaticSources::new(PropertyStore::new()).with_default("port: 8080");
/// let contract = Contract::builder("Server")
///     .operation(Operation::builder("port").returns(ReturnShape::Primitive(ScalarType::I32)).build())
///     .build();
///
/// let binder = Binder::new(sources);
/// let proxy = binder.load(&contract, None)?;
/// assert_eq!(proxy.get_i32("port")?, Some(8080));
/// # Ok::<(), konfig::BindError>(())
/// ```
pub struct Binder {
    provider: Arc<dyn SourceProvider>,
}

impl Binder {
    /// Creates a binder over a source provider.
    pub fn new(provider: impl SourceProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Merge all sources and bind the contract at the root.
    ///
    /// When `selector` is given, the provider resolves it to an override
    /// fragment layered over the defaults. Validation runs before the proxy
    /// is returned; a malformed contract never yields a proxy.
    pub fn load(
        &self,
        contract: &Arc<Contract>,
        selector: Option<&str>,
    ) -> Result<ConfigProxy, BindError> {
        let defaults = self.provider.default_fragments()?;
        let override_text = match selector {
            Some(selector) => self.provider.resolve_override(selector)?,
            None => None,
        };
        debug!(
            contract = contract.name(),
            defaults = defaults.len(),
            overridden = override_text.is_some(),
            "loading configuration"
        );

        let tree = merge_sources(&defaults, override_text.as_deref())?;
        ConfigProxy::root(contract, tree, Arc::clone(&self.provider))
    }
}
