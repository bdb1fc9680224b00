//! # Method Descriptors
//!
//! Metadata for one stored function, as reported by the descriptor
//! functions. Descriptors are immutable once loaded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One input argument of a stored function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputArg {
    /// Key the caller uses (database name with the configured prefix trimmed)
    pub name: String,

    /// Argument name as declared in the database
    pub db_name: String,

    /// Declared type
    #[serde(rename = "type")]
    pub type_name: String,

    pub required: bool,

    /// Default expression, if the argument has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl InputArg {
    /// Build an argument from its database name, trimming `prefix` for the caller key
    pub fn new(db_name: &str, type_name: &str, required: bool, prefix: &str) -> Self {
        let name = db_name.strip_prefix(prefix).unwrap_or(db_name);
        Self {
            name: name.to_string(),
            db_name: db_name.to_string(),
            type_name: type_name.to_string(),
            required,
            default: None,
            annotation: None,
        }
    }
}

/// One output column of a struct method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputArg {
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl OutputArg {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            annotation: None,
        }
    }
}

/// A registered method
///
/// `outputs` is non-empty only for struct methods, and its order is the
/// column order of the result rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    /// Method name (unique within a registry snapshot)
    pub name: String,

    /// Schema holding the stored function
    pub class: String,

    /// Stored function name
    pub function: String,

    #[serde(default)]
    pub annotation: String,

    pub is_read_only: bool,
    pub is_set: bool,
    pub is_struct: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,

    /// Declared result type; `None` together with no outputs means no result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,

    /// Input arguments by caller key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, InputArg>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputArg>,
}

impl Method {
    /// Create a scalar, singular, no-argument method
    pub fn new(name: &str, class: &str, function: &str) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            function: function.to_string(),
            annotation: String::new(),
            is_read_only: false,
            is_set: false,
            is_struct: false,
            sample: None,
            result_type: None,
            inputs: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    /// Declare the result type
    pub fn returning(mut self, type_name: &str) -> Self {
        self.result_type = Some(type_name.to_string());
        self
    }

    /// Mark the method as returning any number of rows
    pub fn set(mut self) -> Self {
        self.is_set = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    /// Add an input argument, keyed by its caller-facing name
    pub fn with_input(mut self, arg: InputArg) -> Self {
        self.inputs.insert(arg.name.clone(), arg);
        self
    }

    /// Append an output column; the method becomes a struct method
    pub fn with_output(mut self, arg: OutputArg) -> Self {
        self.is_struct = true;
        self.outputs.push(arg);
        self
    }

    /// Whether calls produce no rows to shape
    pub fn is_no_result(&self) -> bool {
        self.outputs.is_empty() && self.result_type.is_none()
    }
}
