//! Capability table: named operations an external dispatcher (a UI shell, a
//! script, `colmatch call`) can invoke with a JSON argument array.
//!
//! | name         | args                         | returns                 |
//! |--------------|------------------------------|-------------------------|
//! | `start`      | `[]`                         | `null`                  |
//! | `excel_diff` | `[pathA, pathB, colA, colB]` | status string           |
//! | `msg_text`   | `[]`                         | last status string      |
//! | `list_files` | `[dir]`                      | sorted names, or `null` |
//!
//! The table is `Send + Sync`. Concurrent `excel_diff` calls each open their
//! own documents; the only shared state is the [`StatusHolder`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use colmatch_engine::{compare_status, CompareOptions, ComparisonRequest, StatusHolder};
use colmatch_io::XlsxOpener;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    UnknownOperation(String),
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    ArgType {
        name: String,
        index: usize,
        expected: &'static str,
    },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::UnknownOperation(name) => write!(f, "unknown operation '{}'", name),
            BindingError::Arity { name, expected, got } => {
                write!(f, "{} takes {} argument(s), got {}", name, expected, got)
            }
            BindingError::ArgType { name, index, expected } => {
                write!(f, "{}: argument {} must be {}", name, index, expected)
            }
        }
    }
}

impl std::error::Error for BindingError {}

pub type BindingResult = Result<Value, BindingError>;

type Handler = Box<dyn Fn(&Args<'_>) -> BindingResult + Send + Sync>;

struct Binding {
    arity: usize,
    handler: Handler,
}

/// Positional arguments of one call, with typed accessors.
pub struct Args<'a> {
    name: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn str(&self, index: usize) -> Result<&'a str, BindingError> {
        self.values
            .get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| self.type_error(index, "a string"))
    }

    pub fn int(&self, index: usize) -> Result<i64, BindingError> {
        self.values
            .get(index)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.type_error(index, "an integer"))
    }

    fn type_error(&self, index: usize, expected: &'static str) -> BindingError {
        BindingError::ArgType {
            name: self.name.to_string(),
            index,
            expected,
        }
    }
}

pub struct Bindings {
    table: BTreeMap<String, Binding>,
    status: Arc<StatusHolder>,
}

impl Bindings {
    /// An empty table around `status`.
    pub fn empty(status: Arc<StatusHolder>) -> Self {
        Self {
            table: BTreeMap::new(),
            status,
        }
    }

    /// The standard table: `start`, `excel_diff`, `msg_text`, `list_files`.
    pub fn new(options: CompareOptions) -> Self {
        let mut bindings = Self::empty(Arc::new(StatusHolder::new()));

        bindings.register("start", 0, |_| {
            log::info!("front end is ready");
            Ok(Value::Null)
        });

        let status = Arc::clone(&bindings.status);
        bindings.register("excel_diff", 4, move |args| {
            let request = ComparisonRequest::new(args.str(0)?, args.str(1)?, args.int(2)?, args.int(3)?);
            let text = compare_status(&request, &XlsxOpener, &options);
            status.set(text.clone());
            Ok(Value::String(text))
        });

        let status = Arc::clone(&bindings.status);
        bindings.register("msg_text", 0, move |_| Ok(Value::String(status.get())));

        bindings.register("list_files", 1, |args| {
            let dir = args.str(0)?;
            Ok(list_files(Path::new(dir)).map_or(Value::Null, |names| {
                Value::Array(names.into_iter().map(Value::String).collect())
            }))
        });

        bindings
    }

    pub fn register<F>(&mut self, name: &str, arity: usize, handler: F)
    where
        F: Fn(&Args<'_>) -> BindingResult + Send + Sync + 'static,
    {
        self.table.insert(
            name.to_string(),
            Binding {
                arity,
                handler: Box::new(handler),
            },
        );
    }

    pub fn call(&self, name: &str, args: &[Value]) -> BindingResult {
        let binding = self
            .table
            .get(name)
            .ok_or_else(|| BindingError::UnknownOperation(name.to_string()))?;
        if args.len() != binding.arity {
            return Err(BindingError::Arity {
                name: name.to_string(),
                expected: binding.arity,
                got: args.len(),
            });
        }
        log::debug!("call {} with {} argument(s)", name, args.len());
        (binding.handler)(&Args { name, values: args })
    }

    pub fn names(&self) -> Vec<&str> {
        self.table.keys().map(String::as_str).collect()
    }

    pub fn status(&self) -> Arc<StatusHolder> {
        Arc::clone(&self.status)
    }
}

/// Entry names in `dir`, sorted. None when the directory cannot be read.
pub fn list_files(dir: &Path) -> Option<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("cannot list {}: {}", dir.display(), e);
            return None;
        }
    };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Some(names)
}
