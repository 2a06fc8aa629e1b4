//! Layered source merging.
//!
//! All discovered default fragments are parsed and merged into one tree,
//! then the override fragment (when present) is merged on top. Merging is
//! fallback-directed: each new fragment takes priority over the running
//! tree, objects merge key-by-key recursively, and any other kind replaces
//! the fallback node wholesale.

use konfig_value::Value;
use tracing::debug;

use crate::error::BindError;

/// Parse and merge default fragments, then an optional override fragment.
pub(crate) fn merge_sources(
    defaults: &[String],
    override_text: Option<&str>,
) -> Result<Value, BindError> {
    let mut tree = Value::empty_object();

    for (idx, text) in defaults.iter().enumerate() {
        let fragment = konfig_value::parse(text)?;
        debug!(fragment = idx, "merged default configuration fragment");
        tree = fragment.with_fallback(&tree);
    }

    if let Some(text) = override_text {
        let fragment = konfig_value::parse(text)?;
        debug!("merged override configuration fragment");
        tree = fragment.with_fallback(&tree);
    }

    Ok(tree)
}
