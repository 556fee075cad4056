//! Command argument specs
//!
//! A command declares an ordered list of arguments. At dispatch time the text
//! after the command is split on whitespace and word `i` is coerced by spec
//! `i`. A [`ArgKind::Rest`] argument instead receives the remaining raw text,
//! embedded whitespace included.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::ArgumentError;

/// Parser for [`ArgKind::Custom`]
pub type CustomParser =
    Arc<dyn Fn(&str) -> Result<Arc<dyn Any + Send + Sync>, String> + Send + Sync>;

/// How an argument is coerced
#[derive(Clone)]
pub enum ArgKind {
    Int,
    Float,
    Bool,
    Str,
    /// Everything after the preceding positional words
    Rest,
    Custom(CustomParser),
}

impl ArgKind {
    /// Type name for diagnostics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "string",
            Self::Rest => "rest",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One declared argument
#[derive(Debug, Clone)]
pub struct ArgSpec {
    name: String,
    kind: ArgKind,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Bool)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Str)
    }

    /// The remaining raw text
    pub fn rest(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Rest)
    }

    /// A word parsed by `parser`; read it back with [`CommandArgs::custom`]
    pub fn custom<T, E, F>(name: impl Into<String>, parser: F) -> Self
    where
        T: Any + Send + Sync,
        E: fmt::Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let parser: CustomParser = Arc::new(move |word| {
            parser(word)
                .map(|value| Arc::new(value) as Arc<dyn Any + Send + Sync>)
                .map_err(|e| e.to_string())
        });
        Self::new(name, ArgKind::Custom(parser))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &ArgKind {
        &self.kind
    }

    /// Coerce a single word
    fn coerce(&self, word: &str) -> Result<ArgValue, ArgumentError> {
        let invalid = |reason: String| ArgumentError::Invalid {
            name: self.name.clone(),
            value: word.to_string(),
            reason,
        };

        match &self.kind {
            ArgKind::Int => word
                .parse()
                .map(ArgValue::Int)
                .map_err(|e: std::num::ParseIntError| invalid(e.to_string())),
            ArgKind::Float => word
                .parse()
                .map(ArgValue::Float)
                .map_err(|e: std::num::ParseFloatError| invalid(e.to_string())),
            ArgKind::Bool => parse_bool(word)
                .map(ArgValue::Bool)
                .ok_or_else(|| invalid("expected true/false, yes/no, on/off or 1/0".to_string())),
            ArgKind::Str | ArgKind::Rest => Ok(ArgValue::Str(word.to_string())),
            ArgKind::Custom(parser) => parser(word).map(ArgValue::Custom).map_err(invalid),
        }
    }
}

fn parse_bool(word: &str) -> Option<bool> {
    match word.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// A coerced argument
#[derive(Clone)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Arguments handed to a command callback, in declaration order
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    values: Vec<(String, ArgValue)>,
}

impl CommandArgs {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Values in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn lookup(&self, name: &str) -> Result<&ArgValue, ArgumentError> {
        self.get(name)
            .ok_or_else(|| ArgumentError::Unknown(name.to_string()))
    }

    fn wrong_type(name: &str, expected: &'static str) -> ArgumentError {
        ArgumentError::WrongType {
            name: name.to_string(),
            expected,
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, ArgumentError> {
        match self.lookup(name)? {
            ArgValue::Int(v) => Ok(*v),
            _ => Err(Self::wrong_type(name, "an int")),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, ArgumentError> {
        match self.lookup(name)? {
            ArgValue::Float(v) => Ok(*v),
            _ => Err(Self::wrong_type(name, "a float")),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, ArgumentError> {
        match self.lookup(name)? {
            ArgValue::Bool(v) => Ok(*v),
            _ => Err(Self::wrong_type(name, "a bool")),
        }
    }

    /// A string or rest argument
    pub fn str(&self, name: &str) -> Result<&str, ArgumentError> {
        match self.lookup(name)? {
            ArgValue::Str(v) => Ok(v),
            _ => Err(Self::wrong_type(name, "a string")),
        }
    }

    /// A custom argument, downcast to `T`
    pub fn custom<T: Any + Send + Sync>(&self, name: &str) -> Result<&T, ArgumentError> {
        match self.lookup(name)? {
            ArgValue::Custom(v) => v
                .downcast_ref::<T>()
                .ok_or_else(|| Self::wrong_type(name, std::any::type_name::<T>())),
            _ => Err(Self::wrong_type(name, std::any::type_name::<T>())),
        }
    }
}

/// Coerce the text following a command against `specs`
///
/// # Errors
/// `ArgumentError::Missing` if there are fewer words than positional specs,
/// `ArgumentError::Invalid` if a word fails to coerce
pub fn parse_arguments(specs: &[ArgSpec], remainder: &str) -> Result<CommandArgs, ArgumentError> {
    let words: Vec<&str> = remainder.split_whitespace().collect();
    let mut rest = remainder.to_string();
    let mut values = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        let value = if matches!(spec.kind, ArgKind::Rest) {
            ArgValue::Str(rest.trim_start().to_string())
        } else {
            let word = words.get(index).ok_or_else(|| ArgumentError::Missing {
                name: spec.name.clone(),
            })?;
            let value = spec.coerce(word)?;
            rest = rest.replacen(word, "", 1);
            value
        };
        values.push((spec.name.clone(), value));
    }

    Ok(CommandArgs { values })
}
