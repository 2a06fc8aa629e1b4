//! Recursive coercion from configuration nodes to materialized values.
//!
//! Coercion is driven entirely by the operation's declared shape, never by
//! the node's own kind: a mismatch is reported as a conversion error, not
//! papered over. Lists and maps recurse with an element type resolved from
//! the operation's type-descriptor argument; object-shaped nodes become
//! nested binding contexts when the element type is a contract.

use std::sync::Arc;

use konfig_value::{Lookup, Number, Value};

use crate::contract::{ElementType, Operation, ReturnShape, ScalarType};
use crate::error::{BindError, ErrorPath, MissingReason, TypeParamKind};
use crate::materialized::{Materialized, Scalar};
use crate::proxy::ConfigProxy;
use crate::source::SourceProvider;

/// One coercion pass over a tree, at a fixed parent stack.
pub(crate) struct Coercer<'a> {
    pub(crate) tree: &'a Arc<Value>,
    pub(crate) parents: &'a [String],
    pub(crate) provider: &'a Arc<dyn SourceProvider>,
}

impl Coercer<'_> {
    fn err_path(&self, path: &str) -> ErrorPath {
        ErrorPath::new(self.parents, path)
    }

    /// Materialize one operation's value at the given dotted path.
    pub(crate) fn materialize(
        &self,
        operation: &Operation,
        path: &str,
        element: Option<&ElementType>,
    ) -> Result<Materialized, BindError> {
        match operation.shape() {
            ReturnShape::Scalar(target) => match self.tree.lookup(path) {
                Lookup::Missing | Lookup::Null => Ok(Materialized::Absent),
                Lookup::Found(node) => {
                    self.to_scalar(node, *target, path).map(Materialized::Scalar)
                }
            },
            ReturnShape::Primitive(target) => match self.tree.lookup(path) {
                Lookup::Missing => Err(BindError::missing(
                    self.err_path(path),
                    MissingReason::Undefined,
                    target.name(),
                )),
                Lookup::Null => Err(BindError::missing(
                    self.err_path(path),
                    MissingReason::Null,
                    target.name(),
                )),
                Lookup::Found(node) => {
                    self.to_scalar(node, *target, path).map(Materialized::Scalar)
                }
            },
            ReturnShape::Contract(contract) => match self.tree.lookup(path) {
                Lookup::Missing | Lookup::Null => Ok(Materialized::Absent),
                Lookup::Found(node) => {
                    if node.as_object().is_some() {
                        let proxy = ConfigProxy::create(
                            Arc::clone(contract),
                            format!("{path}."),
                            self.parents.to_vec(),
                            Arc::clone(self.tree),
                            Arc::clone(self.provider),
                        )?;
                        Ok(Materialized::Contract(proxy))
                    } else {
                        Err(BindError::conversion(
                            self.err_path(path),
                            node.type_name(),
                            contract.name(),
                        ))
                    }
                }
            },
            ReturnShape::List => {
                let element = self.resolve_element(operation, path, element)?;
                match self.tree.lookup(path) {
                    Lookup::Missing | Lookup::Null => Ok(Materialized::Absent),
                    Lookup::Found(node) => self.to_list(node, &element, path),
                }
            }
            ReturnShape::Map => {
                let element = self.resolve_element(operation, path, element)?;
                match self.tree.lookup(path) {
                    Lookup::Missing | Lookup::Null => Ok(Materialized::Absent),
                    Lookup::Found(node) => self.to_map(node, &element, path),
                }
            }
            ReturnShape::Properties
            | ReturnShape::Array
            | ReturnShape::Sequence(_)
            | ReturnShape::Mapping(_) => Err(BindError::internal(
                self.err_path(path),
                "unvalidated return shape reached coercion",
            )),
        }
    }

    /// Resolve the element type for a list or map operation. Operations
    /// declared without a type-descriptor parameter materialize with
    /// natural element types; disallowed descriptors are rejected here, at
    /// call time.
    fn resolve_element(
        &self,
        operation: &Operation,
        path: &str,
        element: Option<&ElementType>,
    ) -> Result<ElementType, BindError> {
        if operation.params().is_empty() {
            return Ok(ElementType::Any);
        }
        let Some(element) = element else {
            return Err(BindError::contract(
                self.err_path(path),
                "missing type descriptor argument",
            ));
        };
        match element {
            ElementType::Array => Err(BindError::type_parameter(
                self.err_path(path),
                TypeParamKind::Array,
            )),
            ElementType::Sequence => Err(BindError::type_parameter(
                self.err_path(path),
                TypeParamKind::Sequence,
            )),
            ElementType::Mapping => Err(BindError::type_parameter(
                self.err_path(path),
                TypeParamKind::Mapping,
            )),
            other => Ok(other.clone()),
        }
    }

    fn to_scalar(
        &self,
        node: &Value,
        target: ScalarType,
        path: &str,
    ) -> Result<Scalar, BindError> {
        let mismatch = || {
            BindError::conversion(self.err_path(path), node.type_name(), target.name())
        };

        match target {
            ScalarType::Bool => match node {
                Value::Bool(v) => Ok(Scalar::Bool(*v)),
                _ => Err(mismatch()),
            },
            ScalarType::Str => match node {
                Value::Str(v) => Ok(Scalar::Str(v.clone())),
                _ => Err(mismatch()),
            },
            ScalarType::Char => match node {
                Value::Str(v) => {
                    let mut chars = v.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Ok(Scalar::Char(c)),
                        _ => Err(mismatch()),
                    }
                }
                _ => Err(mismatch()),
            },
            ScalarType::I8 => self.to_integer(node, target, path).map(|v| {
                Scalar::I8(v as i8)
            }),
            ScalarType::I16 => self.to_integer(node, target, path).map(|v| {
                Scalar::I16(v as i16)
            }),
            ScalarType::I32 => self.to_integer(node, target, path).map(|v| {
                Scalar::I32(v as i32)
            }),
            ScalarType::I64 => self.to_integer(node, target, path).map(Scalar::I64),
            ScalarType::F32 => match node {
                Value::Number(n) => Ok(Scalar::F32(n.as_f64() as f32)),
                _ => Err(mismatch()),
            },
            ScalarType::F64 => match node {
                Value::Number(n) => Ok(Scalar::F64(n.as_f64())),
                _ => Err(mismatch()),
            },
        }
    }

    /// Coerce a number node to an integer target, checking range. A float
    /// converts only when it is whole and in range.
    fn to_integer(
        &self,
        node: &Value,
        target: ScalarType,
        path: &str,
    ) -> Result<i64, BindError> {
        let mismatch = || {
            BindError::conversion(self.err_path(path), node.type_name(), target.name())
        };
        let (min, max) = match target {
            ScalarType::I8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
            ScalarType::I16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            ScalarType::I32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
            _ => (i64::MIN, i64::MAX),
        };

        match node {
            Value::Number(Number::Int(v)) if (min..=max).contains(v) => Ok(*v),
            Value::Number(Number::Float(v))
                if v.fract() == 0.0 && *v >= min as f64 && *v <= max as f64 =>
            {
                Ok(*v as i64)
            }
            _ => Err(mismatch()),
        }
    }

    /// Coerce a scalar node to its natural representation: integers that
    /// fit become `i32`, larger ones `i64`, floats `f64`.
    fn to_any(&self, node: &Value, path: &str) -> Result<Scalar, BindError> {
        match node {
            Value::Bool(v) => Ok(Scalar::Bool(*v)),
            Value::Number(Number::Int(v)) => {
                if let Ok(small) = i32::try_from(*v) {
                    Ok(Scalar::I32(small))
                } else {
                    Ok(Scalar::I64(*v))
                }
            }
            Value::Number(Number::Float(v)) => Ok(Scalar::F64(*v)),
            Value::Str(v) => Ok(Scalar::Str(v.clone())),
            _ => Err(BindError::internal(
                self.err_path(path),
                format!("{} node reached scalar coercion", node.type_name()),
            )),
        }
    }

    fn coerce_element(
        &self,
        node: &Value,
        element: &ElementType,
        path: &str,
    ) -> Result<Scalar, BindError> {
        match element {
            ElementType::Any => self.to_any(node, path),
            ElementType::Scalar(target) => self.to_scalar(node, *target, path),
            ElementType::Contract(contract) => Err(BindError::conversion(
                self.err_path(path),
                node.type_name(),
                contract.name(),
            )),
            ElementType::Array | ElementType::Sequence | ElementType::Mapping => {
                Err(BindError::internal(
                    self.err_path(path),
                    "rejected type descriptor reached coercion",
                ))
            }
        }
    }

    fn to_list(
        &self,
        node: &Value,
        element: &ElementType,
        path: &str,
    ) -> Result<Materialized, BindError> {
        let Some(items) = node.as_list() else {
            return Err(BindError::conversion(
                self.err_path(path),
                node.type_name(),
                "list",
            ));
        };

        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let value = match item {
                Value::Null => Materialized::Absent,
                Value::List(_) => self.to_list(item, element, path)?,
                Value::Object(_) => {
                    let mut parents = self.parents.to_vec();
                    parents.push(path.to_string());
                    if let ElementType::Contract(contract) = element {
                        Materialized::Contract(ConfigProxy::create(
                            Arc::clone(contract),
                            String::new(),
                            parents,
                            Arc::new(item.clone()),
                            Arc::clone(self.provider),
                        )?)
                    } else {
                        // Object elements without a contract element type
                        // materialize as maps over the element subtree.
                        let subtree = Arc::new(item.clone());
                        let nested = Coercer {
                            tree: &subtree,
                            parents: &parents,
                            provider: self.provider,
                        };
                        nested.to_map(item, element, "")?
                    }
                }
                _ => Materialized::Scalar(self.coerce_element(item, element, path)?),
            };
            out.push(value);
        }
        Ok(Materialized::List(out))
    }

    fn to_map(
        &self,
        node: &Value,
        element: &ElementType,
        path: &str,
    ) -> Result<Materialized, BindError> {
        let Some(entries) = node.as_object() else {
            return Err(BindError::conversion(
                self.err_path(path),
                node.type_name(),
                "map",
            ));
        };

        let mut out = indexmap::IndexMap::with_capacity(entries.len());
        for (key, item) in entries {
            let entry_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };
            let value = match item {
                Value::Null => continue,
                Value::List(_) => self.to_list(item, element, &entry_path)?,
                Value::Object(_) => {
                    if let ElementType::Contract(contract) = element {
                        Materialized::Contract(ConfigProxy::create(
                            Arc::clone(contract),
                            format!("{entry_path}."),
                            self.parents.to_vec(),
                            Arc::clone(self.tree),
                            Arc::clone(self.provider),
                        )?)
                    } else {
                        self.to_map(item, element, &entry_path)?
                    }
                }
                _ => Materialized::Scalar(self.coerce_element(item, element, &entry_path)?),
            };
            out.insert(key.clone(), value);
        }
        Ok(Materialized::Map(out))
    }
}
