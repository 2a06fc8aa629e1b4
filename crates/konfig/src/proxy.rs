//! Binding contexts and the configuration proxy.
//!
//! A [`ConfigProxy`] implements a contract's operations against a merged
//! configuration tree. Each proxy owns a binding context: the contract, the
//! dotted prefix its operation names resolve under, the parent segments
//! accumulated by list descents, and a mutable state holding the tree and
//! the memo of completed operations.
//!
//! Invocation order per operation: dispatch by name, memo lookup, overlay
//! injection (root contexts only, once per operation path), coercion, memo
//! insertion. Errors are never memoized; a failing operation recomputes on
//! the next call against the already-injected tree. Only a syntax error in
//! the overlay value leaves its path eligible for re-injection.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use konfig_value::Value;
use parking_lot::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::coerce::Coercer;
use crate::contract::{Contract, ElementType};
use crate::error::{BindError, ErrorPath};
use crate::materialized::{Materialized, Scalar};
use crate::source::SourceProvider;
use crate::validate::validate_contract;
use crate::Properties;

struct BindingContext {
    contract: Arc<Contract>,
    /// Dotted prefix the operation names resolve under, empty or ending in
    /// a dot.
    prefix: String,
    /// Parent path segments from list descents, oldest first.
    parents: Vec<String>,
    provider: Arc<dyn SourceProvider>,
    state: Mutex<ContextState>,
    id: Uuid,
}

struct ContextState {
    tree: Arc<Value>,
    memo: HashMap<String, Materialized>,
    /// Paths whose overlay injection already ran, successfully or as a
    /// no-op. A syntax error does not mark the path, so it retries.
    injected: HashSet<String>,
}

/// A live binding of one contract to configuration data.
///
/// Clones share the binding context, so memoized results and injected
/// overlay values are visible through every handle. Equality is context
/// identity.
#[derive(Clone)]
pub struct ConfigProxy {
    ctx: Arc<BindingContext>,
}

impl ConfigProxy {
    /// Create a context after validating the contract at its prefix.
    pub(crate) fn create(
        contract: Arc<Contract>,
        prefix: String,
        parents: Vec<String>,
        tree: Arc<Value>,
        provider: Arc<dyn SourceProvider>,
    ) -> Result<Self, BindError> {
        validate_contract(prefix.trim_end_matches('.'), &parents, &contract)?;
        debug!(contract = contract.name(), %prefix, "created binding context");
        Ok(Self {
            ctx: Arc::new(BindingContext {
                contract,
                prefix,
                parents,
                provider,
                state: Mutex::new(ContextState {
                    tree,
                    memo: HashMap::new(),
                    injected: HashSet::new(),
                }),
                id: Uuid::new_v4(),
            }),
        })
    }

    /// Bind a contract to a merged tree at the root.
    pub fn root(
        contract: &Arc<Contract>,
        tree: Value,
        provider: Arc<dyn SourceProvider>,
    ) -> Result<Self, BindError> {
        Self::create(
            Arc::clone(contract),
            String::new(),
            Vec::new(),
            Arc::new(tree),
            provider,
        )
    }

    /// The bound contract.
    #[must_use]
    pub fn contract(&self) -> &Arc<Contract> {
        &self.ctx.contract
    }

    /// Invoke an operation by name.
    ///
    /// List and map operations declared with a type-descriptor parameter
    /// take their element type through `element`; every other operation
    /// ignores it.
    pub fn invoke(
        &self,
        name: &str,
        element: Option<&ElementType>,
    ) -> Result<Materialized, BindError> {
        let ctx = &self.ctx;
        let Some(operation) = ctx.contract.get(name) else {
            let path = format!("{}{}", ctx.prefix, name);
            return Err(BindError::unknown_operation(ErrorPath::new(
                &ctx.parents,
                &path,
            )));
        };

        // The property bag reflects the current tree on every call.
        if operation.is_reserved_properties() {
            let bag = self
                .properties()
                .into_iter()
                .map(|(key, text)| (key, Materialized::Scalar(Scalar::Str(text))))
                .collect();
            return Ok(Materialized::Map(bag));
        }

        let path = format!("{}{}", ctx.prefix, name);
        let mut state = ctx.state.lock();

        if let Some(hit) = state.memo.get(&path) {
            trace!(%path, "memoized operation result");
            return Ok(hit.clone());
        }

        // The overlay is consulted only at the root of a tree (contexts
        // reached through list descents read their element subtree as-is),
        // and only once per operation path: a later recomputation after a
        // coercion error reuses the already-injected tree.
        if ctx.parents.is_empty() && !state.injected.contains(&path) {
            if let Some(raw) = ctx.provider.overlay(&path) {
                let fragment = konfig_value::parse(&format!("{path}: {raw}"))
                    .map_err(|_| BindError::syntax(ErrorPath::new(&ctx.parents, &path)))?;
                debug!(%path, "injected overlay value");
                state.tree = Arc::new(fragment.with_fallback(&state.tree));
            }
            state.injected.insert(path.clone());
        }

        let coercer = Coercer {
            tree: &state.tree,
            parents: &ctx.parents,
            provider: &ctx.provider,
        };
        let result = coercer.materialize(operation, &path, element)?;
        state.memo.insert(path, result.clone());
        Ok(result)
    }

    /// The flattened property bag: every scalar leaf under this context's
    /// prefix, keyed by its dotted path relative to the prefix.
    ///
    /// Never memoized and never overlay-injected; reflects the tree as it
    /// stands, including overlay values injected by earlier operations.
    #[must_use]
    pub fn properties(&self) -> Properties {
        let state = self.ctx.state.lock();
        let mut bag = Properties::new();
        for (key, text) in state.tree.leaf_entries() {
            if let Some(relative) = key.strip_prefix(&self.ctx.prefix) {
                bag.insert(relative.to_string(), text);
            }
        }
        bag
    }

    fn mismatch(&self, name: &str, ty: &str) -> BindError {
        let path = format!("{}{}", self.ctx.prefix, name);
        BindError::internal(
            ErrorPath::new(&self.ctx.parents, &path),
            format!("operation does not produce a {ty}"),
        )
    }

    /// Invoke a boolean-returning operation.
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::Bool(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "bool")),
        }
    }

    /// Invoke an `i8`-returning operation.
    pub fn get_i8(&self, name: &str) -> Result<Option<i8>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::I8(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "i8")),
        }
    }

    /// Invoke an `i16`-returning operation.
    pub fn get_i16(&self, name: &str) -> Result<Option<i16>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::I16(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "i16")),
        }
    }

    /// Invoke an `i32`-returning operation.
    pub fn get_i32(&self, name: &str) -> Result<Option<i32>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::I32(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "i32")),
        }
    }

    /// Invoke an `i64`-returning operation.
    pub fn get_i64(&self, name: &str) -> Result<Option<i64>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::I64(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "i64")),
        }
    }

    /// Invoke an `f32`-returning operation.
    pub fn get_f32(&self, name: &str) -> Result<Option<f32>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::F32(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "f32")),
        }
    }

    /// Invoke an `f64`-returning operation.
    pub fn get_f64(&self, name: &str) -> Result<Option<f64>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::F64(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "f64")),
        }
    }

    /// Invoke a character-returning operation.
    pub fn get_char(&self, name: &str) -> Result<Option<char>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::Char(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "char")),
        }
    }

    /// Invoke a string-returning operation.
    pub fn get_string(&self, name: &str) -> Result<Option<String>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Scalar(Scalar::Str(v)) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "string")),
        }
    }

    /// Invoke a list-returning operation.
    pub fn get_list(
        &self,
        name: &str,
        element: Option<&ElementType>,
    ) -> Result<Option<Vec<Materialized>>, BindError> {
        match self.invoke(name, element)? {
            Materialized::Absent => Ok(None),
            Materialized::List(items) => Ok(Some(items)),
            _ => Err(self.mismatch(name, "list")),
        }
    }

    /// Invoke a map-returning operation.
    pub fn get_map(
        &self,
        name: &str,
        element: Option<&ElementType>,
    ) -> Result<Option<indexmap::IndexMap<String, Materialized>>, BindError> {
        match self.invoke(name, element)? {
            Materialized::Absent => Ok(None),
            Materialized::Map(entries) => Ok(Some(entries)),
            _ => Err(self.mismatch(name, "map")),
        }
    }

    /// Invoke an operation returning a nested contract.
    pub fn get_contract(&self, name: &str) -> Result<Option<ConfigProxy>, BindError> {
        match self.invoke(name, None)? {
            Materialized::Absent => Ok(None),
            Materialized::Contract(proxy) => Ok(Some(proxy)),
            _ => Err(self.mismatch(name, "contract")),
        }
    }
}

impl PartialEq for ConfigProxy {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ctx, &other.ctx)
    }
}

impl Eq for ConfigProxy {}

impl fmt::Display for ConfigProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ctx.contract.name(), self.ctx.id)
    }
}

impl fmt::Debug for ConfigProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigProxy")
            .field("contract", &self.ctx.contract.name())
            .field("prefix", &self.ctx.prefix)
            .field("id", &self.ctx.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Operation, ReturnShape, ScalarType};
    use crate::source::{PropertyStore, StaticSources};

    fn provider() -> Arc<dyn SourceProvider> {
        Arc::new(StaticSources::new(PropertyStore::new()))
    }

    fn simple_contract() -> Arc<Contract> {
        Contract::builder("C")
            .operation(
                Operation::builder("a")
                    .returns(ReturnShape::Scalar(ScalarType::Bool))
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_clones_share_identity() {
        let tree = konfig_value::parse("a: true").unwrap();
        let proxy = ConfigProxy::root(&simple_contract(), tree, provider()).unwrap();
        let clone = proxy.clone();
        assert_eq!(proxy, clone);
        assert_eq!(proxy.to_string(), clone.to_string());
    }

    #[test]
    fn test_distinct_contexts_differ() {
        let contract = simple_contract();
        let a = ConfigProxy::root(&contract, konfig_value::parse("a: true").unwrap(), provider())
            .unwrap();
        let b = ConfigProxy::root(&contract, konfig_value::parse("a: true").unwrap(), provider())
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_operation() {
        let tree = konfig_value::parse("a: true").unwrap();
        let proxy = ConfigProxy::root(&simple_contract(), tree, provider()).unwrap();
        let err = proxy.invoke("nope", None).unwrap_err();
        assert_eq!(err.to_string(), "nope: unknown operation");
    }

    #[test]
    fn test_display_names_contract() {
        let tree = konfig_value::parse("a: true").unwrap();
        let proxy = ConfigProxy::root(&simple_contract(), tree, provider()).unwrap();
        assert!(proxy.to_string().starts_with("C@"));
    }
}
