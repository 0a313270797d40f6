//! Binding positional and keyword construction arguments
//!
//! Every handler kind has an ordered parameter list. Binding starts from the
//! kind's defaults, then positional arguments fill parameters in order and
//! keyword arguments fill them by name. Typed getters read the bound values
//! back, treating an explicit `null` like an absent value.

use crate::core::{LoggerError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Arguments bound to a handler kind's parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs {
    kind: String,
    values: HashMap<String, Value>,
}

/// Bind `args` and `kwargs` against `params`.
///
/// # Errors
///
/// Returns a configuration error for more positional arguments than
/// parameters, an unknown keyword, or a keyword that repeats a positional
/// argument.
pub fn bind(
    kind: &str,
    params: &[&str],
    defaults: Vec<(&str, Value)>,
    args: &[Value],
    kwargs: &Map<String, Value>,
) -> Result<BoundArgs> {
    if args.len() > params.len() {
        return Err(LoggerError::config(
            kind,
            format!(
                "takes at most {} positional arguments ({} given)",
                params.len(),
                args.len()
            ),
        ));
    }

    let mut values: HashMap<String, Value> = defaults
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    for (param, value) in params.iter().zip(args) {
        values.insert((*param).to_string(), value.clone());
    }

    for (name, value) in kwargs {
        match params.iter().position(|param| *param == name.as_str()) {
            None => {
                return Err(LoggerError::config(
                    kind,
                    format!("unexpected keyword argument '{}'", name),
                ))
            }
            Some(index) if index < args.len() => {
                return Err(LoggerError::config(
                    kind,
                    format!("got multiple values for argument '{}'", name),
                ))
            }
            Some(_) => {
                values.insert(name.clone(), value.clone());
            }
        }
    }

    Ok(BoundArgs {
        kind: kind.to_string(),
        values,
    })
}

impl BoundArgs {
    fn invalid(&self, name: &str, expected: &str, value: &Value) -> LoggerError {
        LoggerError::config(
            &self.kind,
            format!("argument '{}' must be {}, got {}", name, expected, value),
        )
    }

    /// Raw value, `None` when absent or `null`
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|value| !value.is_null())
    }

    pub fn str(&self, name: &str) -> Result<Option<String>> {
        match self.value(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(name, "a string", other)),
        }
    }

    pub fn required_str(&self, name: &str) -> Result<String> {
        self.str(name)?.ok_or_else(|| {
            LoggerError::config(&self.kind, format!("missing required argument '{}'", name))
        })
    }

    pub fn bool(&self, name: &str, default: bool) -> Result<bool> {
        match self.value(name) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.invalid(name, "a boolean", other)),
        }
    }

    pub fn u64(&self, name: &str, default: u64) -> Result<u64> {
        match self.value(name) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .ok_or_else(|| self.invalid(name, "a non-negative integer", value)),
        }
    }

    pub fn f64(&self, name: &str, default: f64) -> Result<f64> {
        match self.value(name) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| self.invalid(name, "a number", value)),
        }
    }

    pub fn port(&self, name: &str, default: u16) -> Result<u16> {
        let port = self.u64(name, u64::from(default))?;
        u16::try_from(port).map_err(|_| {
            LoggerError::config(&self.kind, format!("argument '{}' is not a valid port: {}", name, port))
        })
    }

    /// A string or a list of strings
    pub fn str_list(&self, name: &str) -> Result<Vec<String>> {
        match self.value(name) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(self.invalid(name, "a list of strings", other)),
                })
                .collect(),
            Some(other) => Err(self.invalid(name, "a string or a list of strings", other)),
        }
    }

    /// Either `"host"` or `["host", port]`
    pub fn host_port(&self, name: &str, default_port: u16) -> Result<Option<(String, u16)>> {
        let value = match self.value(name) {
            None => return Ok(None),
            Some(value) => value,
        };
        match value {
            Value::String(host) => Ok(Some((host.clone(), default_port))),
            Value::Array(items) => match items.as_slice() {
                [Value::String(host), port] => {
                    let port = port
                        .as_u64()
                        .and_then(|p| u16::try_from(p).ok())
                        .ok_or_else(|| self.invalid(name, "a [host, port] pair", value))?;
                    Ok(Some((host.clone(), port)))
                }
                _ => Err(self.invalid(name, "a [host, port] pair", value)),
            },
            other => Err(self.invalid(name, "a host or a [host, port] pair", other)),
        }
    }
}
