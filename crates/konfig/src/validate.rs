//! Contract shape validation.
//!
//! Runs once per binding-context creation, over every declared operation,
//! before any proxy is handed out. Nested contracts validate when their own
//! context is created, so a contract reached through an object-typed
//! operation is checked at the moment it is first materialized.

use crate::contract::{Contract, Operation, ParamShape, ReturnShape};
use crate::error::{BindError, ErrorPath};

/// Validate a contract at the given dotted prefix (without trailing dot).
///
/// The checks apply in order: interface-ness, disallowed return shapes,
/// parameter shapes, default bodies, static members. The reserved
/// `properties` operation is always accepted.
pub(crate) fn validate_contract(
    path: &str,
    parents: &[String],
    contract: &Contract,
) -> Result<(), BindError> {
    if !contract.is_interface() {
        return Err(BindError::contract(
            ErrorPath::new(parents, path),
            format!("{} is not an interface", contract.name()),
        ));
    }

    for operation in contract.operations() {
        if operation.is_reserved_properties() {
            continue;
        }
        validate_operation(path, parents, operation)?;
    }

    Ok(())
}

fn validate_operation(
    path: &str,
    parents: &[String],
    operation: &Operation,
) -> Result<(), BindError> {
    let name = operation.name();
    let op_path = if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    };
    let err = |message: String| BindError::contract(ErrorPath::new(parents, &op_path), message);

    match operation.shape() {
        ReturnShape::Array => {
            return Err(err(format!("{name}: a list should be used instead of an array")));
        }
        ReturnShape::Sequence(concrete) => {
            return Err(err(format!("{name}: a list should be used instead of {concrete}")));
        }
        ReturnShape::Mapping(concrete) => {
            return Err(err(format!("{name}: a map should be used instead of {concrete}")));
        }
        ReturnShape::Properties => {
            // The property bag is map-like everywhere except the reserved
            // `properties` operation, which was skipped above.
            return Err(err(format!("{name}: a map should be used instead of a property bag")));
        }
        ReturnShape::List | ReturnShape::Map => {
            if operation.params().len() > 1 {
                return Err(err(format!("{name} may have not more than 1 parameter")));
            }
            if let [param] = operation.params() {
                if *param != ParamShape::TypeDescriptor {
                    return Err(err(format!("parameter of {name} should be a type descriptor")));
                }
            }
        }
        ReturnShape::Scalar(_) | ReturnShape::Primitive(_) | ReturnShape::Contract(_) => {
            if !operation.params().is_empty() {
                return Err(err(format!("{name} may have no parameters")));
            }
        }
    }

    if operation.has_default_body() {
        return Err(err(format!("{name}: operations with default bodies are not allowed")));
    }
    if operation.is_static() {
        return Err(err(format!("{name}: static operations are not allowed")));
    }

    Ok(())
}
