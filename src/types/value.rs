use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::input::Input;

/// A caller-defined value produced by a custom conversion.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

/// The typed result of interpreting an [`Input`].
#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    List(Vec<Value>),
    /// Entries in input order.
    Map(Vec<(Value, Value)>),
    Pair(Box<Value>, Box<Value>),
    Opaque(Opaque),
}

impl Default for Value {
    fn default() -> Self {
        Self::None
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Pair(ak, av), Self::Pair(bk, bv)) => ak == bk && av == bv,
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(&a.value, &b.value),
            _ => false,
        }
    }
}

impl Value {
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Opaque {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        })
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn pair(key: Value, value: Value) -> Self {
        Self::Pair(Box::new(key), Box::new(value))
    }

    /// Untyped view of an input, used by the `any` argument type.
    pub fn from_input(input: &Input) -> Self {
        match input {
            Input::Single { text, .. } => Self::Str(text.clone()),
            Input::List { items, .. } => Self::List(items.iter().map(Self::from_input).collect()),
            Input::Map { entries, .. } => Self::Map(
                entries
                    .iter()
                    .map(|(k, v)| (Self::from_input(k), Self::from_input(v)))
                    .collect(),
            ),
            Input::Empty { .. } => Self::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&Value, &Value)> {
        match self {
            Self::Pair(k, v) => Some((k, v)),
            _ => None,
        }
    }

    /// Looks up a map entry by string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(o) => o.value.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::None => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Char(c) => Json::String(c.to_string()),
            Self::Str(s) => Json::String(s.clone()),
            Self::List(l) => Json::Array(l.iter().map(Value::to_json).collect()),
            Self::Map(m) => {
                let mut object = serde_json::Map::new();
                for (k, v) in m {
                    let key = match k {
                        Self::Str(s) => s.clone(),
                        other => other.to_string(),
                    };
                    object.insert(key, v.to_json());
                }
                Json::Object(object)
            }
            Self::Pair(k, v) => Json::Array(vec![k.to_json(), v.to_json()]),
            Self::Opaque(o) => Json::String(format!("<{}>", o.type_name)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(l) => write!(
                f,
                "[{}]",
                l.iter().map(ToString::to_string).collect::<Vec<String>>().join(", ")
            ),
            Self::Map(m) => write!(
                f,
                "{{{}}}",
                m.iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            Self::Pair(k, v) => write!(f, "({k}, {v})"),
            Self::Opaque(o) => write!(f, "<{}>", o.type_name),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Span;

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    #[test]
    fn test_from_input_tree() {
        let input = Input::map(
            vec![(
                Input::synthetic("k"),
                Input::list(vec![Input::synthetic("1")], Span::synthetic()),
            )],
            Span::synthetic(),
        );
        let value = Value::from_input(&input);
        assert_eq!(value.get("k"), Some(&Value::List(vec![Value::str("1")])));
    }

    #[test]
    fn test_opaque_downcast() {
        let value = Value::opaque(Port(8080));
        assert_eq!(value.downcast_ref::<Port>(), Some(&Port(8080)));
        assert!(value.downcast_ref::<String>().is_none());
        assert_eq!(value, value.clone());
    }

    #[test]
    fn test_to_json() {
        let value = Value::Map(vec![(Value::str("n"), Value::List(vec![Value::Int(1), Value::Bool(true)]))]);
        assert_eq!(value.to_json(), serde_json::json!({"n": [1, true]}));
        assert_eq!(Value::None.to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_display() {
        let value = Value::pair(Value::str("a"), Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(value.to_string(), "(a, [1, 2])");
    }
}
