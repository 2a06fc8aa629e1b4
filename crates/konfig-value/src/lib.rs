//! Configuration value model for the konfig binding engine.
//!
//! This crate provides the untyped side of configuration binding:
//!
//! - [`Value`] - a tagged tree of booleans, numbers, strings, lists,
//!   objects, and explicit nulls
//! - [`parse`] - a relaxed HOCON-style text parser
//! - [`from_json_str`] - strict JSON ingestion through `serde_json`
//! - [`Value::with_fallback`] - layered composition, where lookups that
//!   miss in a primary tree fall through to a fallback tree
//! - [`Value::lookup`] - dotted-path resolution distinguishing missing
//!   paths from explicit nulls
//! - [`Value::leaf_entries`] - flattened enumeration of scalar leaves
//!
//! # Example
//!
//! ```
//! use konfig_value::{parse, Lookup, Number, Value};
//!
//! let defaults = parse("bb: 1\nserver { port: 8080 }").unwrap();
//! let overrides = parse("bb: 2").unwrap();
//! let merged = overrides.with_fallback(&defaults);
//!
//! assert!(matches!(
//!     merged.lookup("bb"),
//!     Lookup::Found(Value::Number(Number::Int(2)))
//! ));
//! assert!(matches!(merged.lookup("server.port"), Lookup::Found(_)));
//! assert!(matches!(merged.lookup("server.host"), Lookup::Missing));
//! ```

mod error;
mod parse;
mod value;

pub use error::ParseError;
pub use parse::parse;
pub use value::{Kind, Lookup, Number, Value};

/// Parse a strict JSON document into a configuration tree.
///
/// # Errors
///
/// Returns [`ParseError::Json`] when the text is not valid JSON.
pub fn from_json_str(text: &str) -> Result<Value, ParseError> {
    Ok(Value::from_json(serde_json::from_str(text)?))
}
