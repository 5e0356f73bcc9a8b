//! Uniform read-only view over document trees
//!
//! Typed contract aggregates and raw `serde_json::Value` trees both
//! implement [`Structured`], so tree walks such as the secret scan are
//! written once and run against either form.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// One level of a document tree.
pub enum Node<'a> {
    /// Absent or explicit null
    Null,
    /// Booleans and numbers
    Scalar,
    /// String value
    Text(&'a str),
    /// Ordered sequence of child documents
    Sequence(Vec<&'a dyn Structured>),
    /// Field name / child document pairs in declaration order
    Mapping(Vec<(Cow<'a, str>, &'a dyn Structured)>),
}

impl<'a> Node<'a> {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Node::Null | Node::Scalar | Node::Text(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Node::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Node::Mapping(_))
    }

    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Node::Text(text) => Some(*text),
            _ => None,
        }
    }

    /// Field names of a mapping, empty for everything else
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            Node::Mapping(fields) => fields.iter().map(|(name, _)| &**name).collect(),
            _ => Vec::new(),
        }
    }

    /// Child document stored under `name`, if this is a mapping that has it
    pub fn field(&self, name: &str) -> Option<&'a dyn Structured> {
        match self {
            Node::Mapping(fields) => fields
                .iter()
                .find(|(field, _)| &**field == name)
                .map(|(_, value)| *value),
            _ => None,
        }
    }
}

/// Read-only capability shared by everything the guard walks.
pub trait Structured {
    fn node(&self) -> Node<'_>;
}

impl Structured for Value {
    fn node(&self) -> Node<'_> {
        match self {
            Value::Null => Node::Null,
            Value::Bool(_) | Value::Number(_) => Node::Scalar,
            Value::String(text) => Node::Text(text),
            Value::Array(items) => {
                Node::Sequence(items.iter().map(|item| item as &dyn Structured).collect())
            }
            Value::Object(map) => map.node(),
        }
    }
}

impl Structured for Map<String, Value> {
    fn node(&self) -> Node<'_> {
        Node::Mapping(
            self.iter()
                .map(|(key, value)| (Cow::Borrowed(key.as_str()), value as &dyn Structured))
                .collect(),
        )
    }
}

impl<T: Structured> Structured for BTreeMap<String, T> {
    fn node(&self) -> Node<'_> {
        Node::Mapping(
            self.iter()
                .map(|(key, value)| (Cow::Borrowed(key.as_str()), value as &dyn Structured))
                .collect(),
        )
    }
}

impl Structured for str {
    fn node(&self) -> Node<'_> {
        Node::Text(self)
    }
}

impl Structured for String {
    fn node(&self) -> Node<'_> {
        Node::Text(self.as_str())
    }
}

impl<T: Structured> Structured for Option<T> {
    fn node(&self) -> Node<'_> {
        match self {
            Some(inner) => inner.node(),
            None => Node::Null,
        }
    }
}

impl<T: Structured> Structured for Vec<T> {
    fn node(&self) -> Node<'_> {
        Node::Sequence(self.iter().map(|item| item as &dyn Structured).collect())
    }
}

macro_rules! scalar_structured {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Structured for $ty {
                fn node(&self) -> Node<'_> {
                    Node::Scalar
                }
            }
        )*
    };
}

scalar_structured!(bool, f64, u32, u64, i64);

/// Implements [`Structured`] for a record by listing its fields.
///
/// Field names are reported as written, which matches the serde names of
/// every contract aggregate.
#[macro_export]
macro_rules! structured_record {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::document::Structured for $ty {
            fn node(&self) -> $crate::document::Node<'_> {
                $crate::document::Node::Mapping(vec![
                    $((
                        ::std::borrow::Cow::Borrowed(stringify!($field)),
                        &self.$field as &dyn $crate::document::Structured,
                    )),*
                ])
            }
        }
    };
}

/// Implements [`Structured`] for a closed enum rendered as its wire string.
#[macro_export]
macro_rules! structured_text {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::document::Structured for $ty {
                fn node(&self) -> $crate::document::Node<'_> {
                    $crate::document::Node::Text(self.as_str())
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Pair {
        left: String,
        right: Option<Vec<String>>,
    }

    structured_record!(Pair { left, right });

    #[test]
    fn test_value_nodes() {
        let doc = json!({"a": [1, "x"], "b": null});
        let node = doc.node();
        assert!(node.is_mapping());
        assert_eq!(node.field_names(), vec!["a", "b"]);

        let a = node.field("a").map(|child| child.node());
        assert!(matches!(a, Some(Node::Sequence(ref items)) if items.len() == 2));
        assert!(matches!(node.field("b").map(|b| b.node()), Some(Node::Null)));
        assert!(node.field("missing").is_none());
    }

    #[test]
    fn test_record_macro_lists_fields_in_order() {
        let pair = Pair {
            left: "l".to_string(),
            right: Some(vec!["r".to_string()]),
        };
        let node = pair.node();
        assert_eq!(node.field_names(), vec!["left", "right"]);
        assert_eq!(node.field("left").and_then(|f| f.node().as_text()), Some("l"));
        assert!(node.field("right").map(|f| f.node().is_sequence()).unwrap_or(false));
    }

    #[test]
    fn test_scalars() {
        assert!(3.5f64.node().is_scalar());
        assert!(true.node().is_scalar());
        assert!(Option::<String>::None.node().is_scalar());
        assert_eq!("abc".node().as_text(), Some("abc"));
    }
}
