//! Contract-based configuration binding over layered sources.
//!
//! Konfig binds caller-declared contracts (named operations with declared
//! return shapes) to a configuration tree merged from layered sources:
//! discovered defaults, an optional override fragment selected per load,
//! and a per-operation key-value overlay consulted lazily. Contracts are
//! validated up front, operations dispatch through a table built at
//! validation, successful results are memoized per binding context, and
//! errors carry the full dotted path of the failing value, with one bracket
//! pair per list descent.
//!
//! # Example
//!
//! ```
//! use konfig::{
//!     Binder, Contract, Operation, PropertyStore, ReturnShape, ScalarType, StaticSources,
//! };
//!
//! let store = PropertyStore::new();
//! let sources = StaticSources::new(store.clone())
//!     .with_default("host: localhost\nport: 8080");
//!
//! let contract = Contract::builder("Server")
//!     .operation(Operation::builder("host").returns(ReturnShape::Scalar(ScalarType::Str)).build())
//!     .operation(Operation::builder("port").returns(ReturnShape::Primitive(ScalarType::I32)).build())
//!     .build();
//!
//! let binder = Binder::new(sources);
//! let server = binder.load(&contract, None)?;
//!
//! assert_eq!(server.get_string("host")?, Some("localhost".to_string()));
//! assert_eq!(server.get_i32("port")?, Some(8080));
//!
//! // The overlay takes priority on first access of a path.
//! store.set("host", "example.org");
//! let server = binder.load(&contract, None)?;
//! assert_eq!(server.get_string("host")?, Some("example.org".to_string()));
//! # Ok::<(), konfig::BindError>(())
//! ```

mod coerce;
mod contract;
mod error;
mod loader;
mod materialized;
mod merge;
mod proxy;
mod source;
mod validate;

pub use contract::{
    Contract, ContractBuilder, ElementType, Operation, OperationBuilder, ParamShape, ReturnShape,
    ScalarType,
};
pub use error::{BindError, ErrorPath, MissingReason, TypeParamKind};
pub use loader::Binder;
pub use materialized::{Materialized, Scalar};
pub use proxy::ConfigProxy;
pub use source::{
    PropertyStore, SearchPathSources, SourceProvider, StaticSources, CLASSPATH_PREFIX,
    DEFAULT_RESOURCE,
};

/// Name of the reserved operation returning the flattened property bag.
pub const PROPERTIES_OPERATION: &str = "properties";

/// The flattened property bag: scalar leaves keyed by dotted path, sorted.
pub type Properties = std::collections::BTreeMap<String, String>;
