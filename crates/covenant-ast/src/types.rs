use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Identity,
    Int,
    String,
    Timestamp,
    Bool,
    Timespan,
    Mapping(Box<DataType>, Box<DataType>),
    Sequence(Box<DataType>),
}

impl DataType {
    pub fn is_composite(&self) -> bool {
        matches!(self, DataType::Mapping(_, _) | DataType::Sequence(_))
    }

    /// Element type of a sequence, value type of a mapping.
    pub fn element(&self) -> Option<&DataType> {
        match self {
            DataType::Sequence(elem) => Some(elem.as_ref()),
            DataType::Mapping(_, value) => Some(value.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Identity => write!(f, "Identity"),
            DataType::Int => write!(f, "Int"),
            DataType::String => write!(f, "String"),
            DataType::Timestamp => write!(f, "Timestamp"),
            DataType::Bool => write!(f, "Bool"),
            DataType::Timespan => write!(f, "Timespan"),
            DataType::Mapping(key, value) => write!(f, "Mapping({} => {})", key, value),
            DataType::Sequence(elem) => write!(f, "Sequence({})", elem),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub ty: DataType,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}
