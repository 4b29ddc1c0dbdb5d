use std::collections::{HashMap, VecDeque};

use crate::db::DbError;

/// A stored value. Every entry in the store is exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(VecDeque<String>),
    Dict(HashMap<String, String>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    pub fn as_scalar(&self) -> Result<&str, DbError> {
        match self {
            Value::Scalar(s) => Ok(s),
            Value::List(_) | Value::Dict(_) => Err(DbError::WrongType),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut VecDeque<String>, DbError> {
        match self {
            Value::List(list) => Ok(list),
            Value::Scalar(_) | Value::Dict(_) => Err(DbError::WrongType),
        }
    }

    pub fn as_dict(&self) -> Result<&HashMap<String, String>, DbError> {
        match self {
            Value::Dict(dict) => Ok(dict),
            Value::Scalar(_) | Value::List(_) => Err(DbError::WrongType),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut HashMap<String, String>, DbError> {
        match self {
            Value::Dict(dict) => Ok(dict),
            Value::Scalar(_) | Value::List(_) => Err(DbError::WrongType),
        }
    }
}
