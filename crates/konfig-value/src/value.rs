//! The configuration value tree.
//!
//! A [`Value`] is a tagged tree of configuration data: scalars (boolean,
//! number, string), ordered lists, string-keyed objects, and explicit nulls.
//! Objects support dotted-path [`Value::lookup`], flattened leaf enumeration
//! via [`Value::leaf_entries`], and fallback composition via
//! [`Value::with_fallback`], where a lookup that misses in the primary tree
//! falls through to a secondary tree.

use indexmap::IndexMap;

/// A node in the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An explicit null.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// A numeric scalar.
    Number(Number),
    /// A string scalar.
    Str(String),
    /// An ordered sequence of nodes.
    List(Vec<Value>),
    /// A string-keyed object, preserving insertion order.
    Object(IndexMap<String, Value>),
}

/// A numeric scalar with its runtime subtype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
}

impl Number {
    /// The runtime subtype name used in diagnostics: `int` for integers
    /// that fit a 32-bit range, `long` for wider integers, `double` for
    /// floating-point values.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Int(i) => {
                if i32::try_from(i).is_ok() {
                    "int"
                } else {
                    "long"
                }
            }
            Self::Float(_) => "double",
        }
    }

    /// The value widened to `f64`.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

/// The kind of a [`Value`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Explicit null.
    Null,
    /// Boolean scalar.
    Bool,
    /// Numeric scalar.
    Number,
    /// String scalar.
    Str,
    /// Ordered sequence.
    List,
    /// String-keyed object.
    Object,
}

/// The result of a dotted-path lookup.
///
/// Distinguishes a path that does not resolve at all from a path that
/// resolves to an explicit null; callers report "undefined" vs "null"
/// accordingly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// No node exists at the path.
    Missing,
    /// The path resolves to an explicit null.
    Null,
    /// The path resolves to a non-null node.
    Found(&'a Value),
}

impl Value {
    /// An empty object, the identity element of fallback composition.
    #[must_use]
    pub fn empty_object() -> Self {
        Self::Object(IndexMap::new())
    }

    /// The kind tag of this node.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Null => Kind::Null,
            Self::Bool(_) => Kind::Bool,
            Self::Number(_) => Kind::Number,
            Self::Str(_) => Kind::Str,
            Self::List(_) => Kind::List,
            Self::Object(_) => Kind::Object,
        }
    }

    /// The type name used in diagnostics. Numbers report their runtime
    /// subtype (`int`, `long`, or `double`).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(n) => n.type_name(),
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    /// The entries of an object node, if this is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// The elements of a list node, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The natural textual form of a scalar: booleans lower-cased, numbers
    /// and strings as written. `None` for null, list, and object nodes.
    #[must_use]
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(Number::Int(i)) => Some(i.to_string()),
            Self::Number(Number::Float(f)) => Some(f.to_string()),
            Self::Str(s) => Some(s.clone()),
            Self::Null | Self::List(_) | Self::Object(_) => None,
        }
    }

    /// Compose this tree over a fallback tree.
    ///
    /// Keys present here shadow the same keys in `fallback`; object values
    /// present in both are merged recursively; a non-object value here
    /// shadows the fallback subtree entirely. An explicit null here hides
    /// the fallback value for that key.
    ///
    /// # Example
    ///
    /// ```
    /// use konfig_value::{parse, Lookup, Value};
    ///
    /// let primary = parse("a: 1").unwrap();
    /// let fallback = parse("a: 2\nb: 3").unwrap();
    /// let merged = primary.with_fallback(&fallback);
    ///
    /// assert!(matches!(merged.lookup("a"), Lookup::Found(_)));
    /// assert!(matches!(merged.lookup("b"), Lookup::Found(_)));
    /// ```
    #[must_use]
    pub fn with_fallback(&self, fallback: &Value) -> Value {
        match (self, fallback) {
            (Self::Object(primary), Self::Object(secondary)) => {
                let mut out = primary.clone();
                for (key, fv) in secondary {
                    match out.get_mut(key) {
                        None => {
                            out.insert(key.clone(), fv.clone());
                        }
                        Some(pv) => {
                            if pv.kind() == Kind::Object && fv.kind() == Kind::Object {
                                *pv = pv.with_fallback(fv);
                            }
                        }
                    }
                }
                Self::Object(out)
            }
            _ => self.clone(),
        }
    }

    /// Resolve a dotted path against this tree.
    ///
    /// Every intermediate segment must resolve to an object; otherwise the
    /// path is [`Lookup::Missing`]. A final segment holding an explicit
    /// null is [`Lookup::Null`].
    #[must_use]
    pub fn lookup(&self, path: &str) -> Lookup<'_> {
        let mut current = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let Self::Object(map) = current else {
                return Lookup::Missing;
            };
            match map.get(segment) {
                None => return Lookup::Missing,
                Some(value) => {
                    if segments.peek().is_none() {
                        return match value {
                            Self::Null => Lookup::Null,
                            other => Lookup::Found(other),
                        };
                    }
                    current = value;
                }
            }
        }
        Lookup::Missing
    }

    /// Every dotted path to a scalar leaf, paired with its natural textual
    /// form. List-valued and null entries are skipped, not errored.
    #[must_use]
    pub fn leaf_entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        if let Self::Object(map) = self {
            for (key, value) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match value {
                    Self::Object(_) => value.collect_leaves(&path, out),
                    Self::Bool(_) | Self::Number(_) | Self::Str(_) => {
                        if let Some(text) = value.scalar_text() {
                            out.push((path, text));
                        }
                    }
                    Self::List(_) | Self::Null => {}
                }
            }
        }
    }

    /// Convert a `serde_json` value into a configuration tree.
    ///
    /// Unsigned integers beyond the `i64` range widen to floats.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Number(Number::Int(i))
                } else {
                    Self::Number(Number::Float(n.as_f64().unwrap_or(f64::MAX)))
                }
            }
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Insert a value at a dotted key path, creating intermediate objects.
///
/// A later value for an existing key wins; when both the existing and the
/// new value are objects they are merged deeply instead of replaced.
pub(crate) fn insert_path(map: &mut IndexMap<String, Value>, segments: &[&str], value: Value) {
    let (head, rest) = match segments {
        [] => return,
        [head, rest @ ..] => (*head, rest),
    };

    if rest.is_empty() {
        match map.get_mut(head) {
            Some(Value::Object(existing)) => {
                if let Value::Object(incoming) = value {
                    let mut merged = std::mem::take(existing);
                    merge_objects(&mut merged, incoming);
                    map.insert(head.to_string(), Value::Object(merged));
                } else {
                    map.insert(head.to_string(), value);
                }
            }
            _ => {
                map.insert(head.to_string(), value);
            }
        }
        return;
    }

    match map.get_mut(head) {
        Some(Value::Object(inner)) => insert_path(inner, rest, value),
        _ => {
            let mut inner = IndexMap::new();
            insert_path(&mut inner, rest, value);
            map.insert(head.to_string(), Value::Object(inner));
        }
    }
}

/// Merge `src` into `dst`, with `src` winning on conflicts and objects
/// merging recursively.
pub(crate) fn merge_objects(dst: &mut IndexMap<String, Value>, src: IndexMap<String, Value>) {
    for (key, incoming) in src {
        match dst.get_mut(&key) {
            Some(Value::Object(existing)) => {
                if let Value::Object(inner) = incoming {
                    let mut merged = std::mem::take(existing);
                    merge_objects(&mut merged, inner);
                    dst.insert(key, Value::Object(merged));
                } else {
                    dst.insert(key, incoming);
                }
            }
            _ => {
                dst.insert(key, incoming);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(entries: Vec<(&str, Value)>) -> Value {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Bool(true).type_name(), "bool");
        assert_eq!(Value::Number(Number::Int(256)).type_name(), "int");
        assert_eq!(
            Value::Number(Number::Int(2_147_483_648)).type_name(),
            "long"
        );
        assert_eq!(Value::Number(Number::Float(1.1)).type_name(), "double");
        assert_eq!(Value::Str("x".into()).type_name(), "string");
        assert_eq!(Value::List(vec![]).type_name(), "list");
        assert_eq!(Value::empty_object().type_name(), "object");
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn test_lookup_distinguishes_missing_and_null() {
        let tree = obj(vec![
            ("a", Value::Number(Number::Int(1))),
            ("b", Value::Null),
            ("c", obj(vec![("x", Value::Str("i".into()))])),
        ]);

        assert!(matches!(tree.lookup("a"), Lookup::Found(_)));
        assert_eq!(tree.lookup("b"), Lookup::Null);
        assert_eq!(tree.lookup("missing"), Lookup::Missing);
        assert!(matches!(tree.lookup("c.x"), Lookup::Found(_)));
        assert_eq!(tree.lookup("c.y"), Lookup::Missing);
        assert_eq!(tree.lookup("a.b"), Lookup::Missing);
    }

    #[test]
    fn test_with_fallback_primary_wins() {
        let primary = obj(vec![("a", Value::Number(Number::Int(1)))]);
        let fallback = obj(vec![
            ("a", Value::Number(Number::Int(2))),
            ("b", Value::Number(Number::Int(3))),
        ]);

        let merged = primary.with_fallback(&fallback);
        assert!(
            matches!(merged.lookup("a"), Lookup::Found(Value::Number(Number::Int(1))))
        );
        assert!(
            matches!(merged.lookup("b"), Lookup::Found(Value::Number(Number::Int(3))))
        );
    }

    #[test]
    fn test_with_fallback_merges_objects_deeply() {
        let primary = obj(vec![("o", obj(vec![("x", Value::Number(Number::Int(1)))]))]);
        let fallback = obj(vec![("o", obj(vec![("y", Value::Number(Number::Int(2)))]))]);

        let merged = primary.with_fallback(&fallback);
        assert!(matches!(merged.lookup("o.x"), Lookup::Found(_)));
        assert!(matches!(merged.lookup("o.y"), Lookup::Found(_)));
    }

    #[test]
    fn test_with_fallback_null_hides_fallback() {
        let primary = obj(vec![("a", Value::Null)]);
        let fallback = obj(vec![("a", Value::Number(Number::Int(2)))]);

        let merged = primary.with_fallback(&fallback);
        assert_eq!(merged.lookup("a"), Lookup::Null);
    }

    #[test]
    fn test_leaf_entries_flatten_and_skip_lists() {
        let tree = obj(vec![
            ("a", Value::Number(Number::Int(1))),
            ("flag", Value::Bool(true)),
            ("l", Value::List(vec![Value::Number(Number::Int(2))])),
            ("n", Value::Null),
            ("o", obj(vec![("x", Value::Str("i".into()))])),
        ]);

        let mut entries = tree.leaf_entries();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "1".to_string()),
                ("flag".to_string(), "true".to_string()),
                ("o.x".to_string(), "i".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": [true, null], "c": {"d": 1.5}}"#).unwrap();
        let tree = Value::from_json(json);

        assert!(
            matches!(tree.lookup("a"), Lookup::Found(Value::Number(Number::Int(1))))
        );
        assert!(matches!(tree.lookup("c.d"), Lookup::Found(Value::Number(Number::Float(_)))));
        let Lookup::Found(Value::List(items)) = tree.lookup("b") else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Value::Null);
    }

    #[test]
    fn test_insert_path_deep_merge() {
        let mut map = IndexMap::new();
        insert_path(&mut map, &["cc", "byte"], Value::Number(Number::Int(127)));
        insert_path(&mut map, &["cc", "short"], Value::Number(Number::Int(1)));

        let tree = Value::Object(map);
        assert!(matches!(tree.lookup("cc.byte"), Lookup::Found(_)));
        assert!(matches!(tree.lookup("cc.short"), Lookup::Found(_)));
    }
}
