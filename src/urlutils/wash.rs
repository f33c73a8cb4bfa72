//! Coercion of loosely typed URL arguments.

use std::collections::BTreeMap;
use std::fmt;

/// A URL argument as handed over by a request parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlArgument {
    /// Plain string value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Repeated argument.
    List(Vec<UrlArgument>),
    /// Fixed group of values.
    Tuple(Vec<UrlArgument>),
    /// Keyed values.
    Dict(BTreeMap<String, UrlArgument>),
}

impl UrlArgument {
    /// Wrap anything that is not already a list into a one-element list.
    pub fn wash_list(self) -> Vec<UrlArgument> {
        match self {
            Self::List(items) => items,
            other => vec![other],
        }
    }

    /// String form; a list yields its first element, or `""` when empty.
    pub fn wash_str(&self) -> String {
        match self {
            Self::List(items) => items.first().map(ToString::to_string).unwrap_or_default(),
            other => other.to_string(),
        }
    }

    /// Integer form; anything unparsable yields `0`. A list yields its first element.
    pub fn wash_int(&self) -> i64 {
        match self {
            Self::Int(value) => *value,
            Self::Str(text) => text.trim().parse().unwrap_or(0),
            Self::List(items) => match items.first() {
                Some(first @ (Self::Int(_) | Self::Str(_))) => first.wash_int(),
                _ => 0,
            },
            Self::Tuple(_) | Self::Dict(_) => 0,
        }
    }

    /// Wrap anything that is not already a tuple into a one-element tuple.
    pub fn wash_tuple(self) -> Vec<UrlArgument> {
        match self {
            Self::Tuple(items) => items,
            other => vec![other],
        }
    }

    /// Keep dictionaries; anything else is stored under the key `"0"`.
    pub fn wash_dict(self) -> BTreeMap<String, UrlArgument> {
        match self {
            Self::Dict(map) => map,
            other => BTreeMap::from([("0".to_string(), other)]),
        }
    }
}

impl fmt::Display for UrlArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[UrlArgument]) -> fmt::Result {
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            Self::Str(text) => f.write_str(text),
            Self::Int(value) => write!(f, "{value}"),
            Self::List(items) => {
                f.write_str("[")?;
                join(f, items)?;
                f.write_str("]")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                join(f, items)?;
                f.write_str(")")
            }
            Self::Dict(map) => {
                f.write_str("{")?;
                for (index, (key, value)) in map.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for UrlArgument {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for UrlArgument {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}
