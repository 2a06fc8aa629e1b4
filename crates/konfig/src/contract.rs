//! Contract descriptors.
//!
//! A contract describes the access interface a caller wants bound to
//! configuration data: a named set of operations, each with a declared
//! return shape and parameter shape. Descriptors replace reflection: the
//! caller (or generated code) states each operation's shape explicitly, and
//! the validator checks the whole descriptor once per binding-context
//! creation, before any value is read.
//!
//! # Example
//!
//! ```
//! use konfig::{Contract, Operation, ReturnShape, ScalarType};
//!
//! let contract = Contract::builder("Server")
//!     .operation(Operation::builder("host").returns(ReturnShape::Scalar(ScalarType::Str)).build())
//!     .operation(Operation::builder("port").returns(ReturnShape::Primitive(ScalarType::I32)).build())
//!     .build();
//!
//! assert_eq!(contract.operations().len(), 2);
//! assert!(contract.get("port").is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

/// A scalar target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// Boolean.
    Bool,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
    /// A single character.
    Char,
    /// A string.
    Str,
}

impl ScalarType {
    /// The type name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::Str => "string",
        }
    }
}

/// The declared return shape of an operation.
#[derive(Debug, Clone)]
pub enum ReturnShape {
    /// A nullable scalar; absence materializes as no value.
    Scalar(ScalarType),
    /// A non-nullable scalar; absence is a [`crate::BindError::Missing`].
    Primitive(ScalarType),
    /// A nested contract, bound to the object node at the operation's path.
    Contract(Arc<Contract>),
    /// The generic list abstraction.
    List,
    /// The generic string-keyed map abstraction.
    Map,
    /// The reserved flattened property bag (only valid on an operation
    /// named `properties` with no parameters).
    Properties,
    /// A raw array type. Declared only to be rejected by the validator.
    Array,
    /// A concrete sequence type (named for diagnostics). Rejected by the
    /// validator; the generic list abstraction must be used instead.
    Sequence(String),
    /// A concrete map type (named for diagnostics). Rejected by the
    /// validator; the generic map abstraction must be used instead.
    Mapping(String),
}

/// The shape of one declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamShape {
    /// A type descriptor identifying the element type to materialize.
    TypeDescriptor,
    /// Any other parameter shape (named for diagnostics).
    Other(String),
}

/// A runtime type-descriptor argument for list and map operations,
/// identifying the element type to materialize.
#[derive(Debug, Clone)]
pub enum ElementType {
    /// No particular element type; scalars pass through in their natural
    /// representation and object-shaped elements materialize as maps.
    Any,
    /// A scalar element type.
    Scalar(ScalarType),
    /// A nested contract element type; object-shaped elements become
    /// proxies over that contract.
    Contract(Arc<Contract>),
    /// An array descriptor. Rejected at call time.
    Array,
    /// A concrete sequence descriptor. Rejected at call time.
    Sequence,
    /// A map-like descriptor. Rejected at call time.
    Mapping,
}

impl ElementType {
    /// Whether the engine constructs this element type as a nested
    /// contract rather than a plain map.
    #[must_use]
    pub fn is_proxyable(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

/// One declared operation of a contract.
#[derive(Debug, Clone)]
pub struct Operation {
    name: String,
    shape: ReturnShape,
    params: Vec<ParamShape>,
    static_member: bool,
    default_body: bool,
}

impl Operation {
    /// Creates a new operation builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(name)
    }

    /// The operation name, which doubles as its configuration path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared return shape.
    #[must_use]
    pub fn shape(&self) -> &ReturnShape {
        &self.shape
    }

    /// The declared parameter shapes.
    #[must_use]
    pub fn params(&self) -> &[ParamShape] {
        &self.params
    }

    /// Whether the operation is a static member of its contract.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.static_member
    }

    /// Whether the operation carries a default body.
    #[must_use]
    pub fn has_default_body(&self) -> bool {
        self.default_body
    }

    /// Whether this is the reserved `properties` operation: that exact
    /// name, no parameters, returning the property bag.
    #[must_use]
    pub fn is_reserved_properties(&self) -> bool {
        self.name == crate::PROPERTIES_OPERATION
            && self.params.is_empty()
            && matches!(self.shape, ReturnShape::Properties)
    }
}

/// Builder for [`Operation`].
#[derive(Debug)]
pub struct OperationBuilder {
    name: String,
    shape: ReturnShape,
    params: Vec<ParamShape>,
    static_member: bool,
    default_body: bool,
}

impl OperationBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: ReturnShape::Scalar(ScalarType::Str),
            params: Vec::new(),
            static_member: false,
            default_body: false,
        }
    }

    /// Sets the declared return shape.
    #[must_use]
    pub fn returns(mut self, shape: ReturnShape) -> Self {
        self.shape = shape;
        self
    }

    /// Appends a declared parameter.
    #[must_use]
    pub fn param(mut self, param: ParamShape) -> Self {
        self.params.push(param);
        self
    }

    /// Declares the single type-descriptor parameter allowed on list and
    /// map operations.
    #[must_use]
    pub fn type_param(self) -> Self {
        self.param(ParamShape::TypeDescriptor)
    }

    /// Marks the operation as a static member.
    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.static_member = true;
        self
    }

    /// Marks the operation as carrying a default body.
    #[must_use]
    pub fn default_body(mut self) -> Self {
        self.default_body = true;
        self
    }

    /// Builds the operation.
    #[must_use]
    pub fn build(self) -> Operation {
        Operation {
            name: self.name,
            shape: self.shape,
            params: self.params,
            static_member: self.static_member,
            default_body: self.default_body,
        }
    }
}

/// A contract: a named interface whose operations the engine implements
/// against merged configuration data.
#[derive(Debug)]
pub struct Contract {
    name: String,
    interface: bool,
    operations: Vec<Operation>,
    /// Operation lookup by name for dispatch.
    operation_index: HashMap<String, usize>,
}

impl Contract {
    /// Creates a new contract builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder::new(name)
    }

    /// The contract name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the descriptor describes an interface-like type. Concrete
    /// types are rejected by the validator.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.interface
    }

    /// All declared operations.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Looks up an operation by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operation_index
            .get(name)
            .map(|&idx| &self.operations[idx])
    }
}

/// Builder for [`Contract`].
#[derive(Debug)]
pub struct ContractBuilder {
    name: String,
    interface: bool,
    operations: Vec<Operation>,
}

impl ContractBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: true,
            operations: Vec::new(),
        }
    }

    /// Marks the descriptor as describing a concrete (non-interface) type.
    /// The validator rejects such contracts; the flag exists so callers
    /// deriving descriptors can report what they saw.
    #[must_use]
    pub fn concrete(mut self) -> Self {
        self.interface = false;
        self
    }

    /// Appends an operation. A later operation with the same name replaces
    /// the earlier one in the dispatch table.
    #[must_use]
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Builds the contract and its dispatch index.
    #[must_use]
    pub fn build(self) -> Arc<Contract> {
        let operation_index = self
            .operations
            .iter()
            .enumerate()
            .map(|(idx, op)| (op.name.clone(), idx))
            .collect();
        Arc::new(Contract {
            name: self.name,
            interface: self.interface,
            operations: self.operations,
            operation_index,
        })
    }
}
