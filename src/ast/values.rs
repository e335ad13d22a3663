use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{DmlError, DmlResult};

/// A bindable value.
///
/// Scalars, their list forms and nullable lists. Nullable scalars are
/// expressed through `From<Option<T>>`, which maps `None` to [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Time(NaiveDateTime),
    Ints(Vec<i64>),
    Uints(Vec<u64>),
    Floats(Vec<f64>),
    Bools(Vec<bool>),
    Strings(Vec<String>),
    BytesList(Vec<Vec<u8>>),
    Times(Vec<NaiveDateTime>),
    NullInts(Vec<Option<i64>>),
    NullFloats(Vec<Option<f64>>),
    NullStrings(Vec<Option<String>>),
    NullTimes(Vec<Option<NaiveDateTime>>),
    /// A driver specific value. Bound as-is, never interpolated.
    Driver(DriverValue),
}

/// Opaque value handed through to the driver.
#[derive(Clone)]
pub struct DriverValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl DriverValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for DriverValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DriverValue({})", self.type_name)
    }
}

impl PartialEq for DriverValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Value {
    /// Build a string value from raw bytes, rejecting malformed UTF-8.
    pub fn text(bytes: impl Into<Vec<u8>>) -> DmlResult<Self> {
        String::from_utf8(bytes.into())
            .map(Value::String)
            .map_err(|e| DmlError::not_valid(format!("string argument is not UTF-8: {e}")))
    }

    pub fn driver<T: Any + Send + Sync>(value: T) -> Self {
        Value::Driver(DriverValue::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Value::Ints(_)
                | Value::Uints(_)
                | Value::Floats(_)
                | Value::Bools(_)
                | Value::Strings(_)
                | Value::BytesList(_)
                | Value::Times(_)
                | Value::NullInts(_)
                | Value::NullFloats(_)
                | Value::NullStrings(_)
                | Value::NullTimes(_)
        )
    }

    /// Number of placeholders the value occupies: one for scalars, the
    /// element count for lists.
    pub fn arity(&self) -> usize {
        match self {
            Value::Ints(v) => v.len(),
            Value::Uints(v) => v.len(),
            Value::Floats(v) => v.len(),
            Value::Bools(v) => v.len(),
            Value::Strings(v) => v.len(),
            Value::BytesList(v) => v.len(),
            Value::Times(v) => v.len(),
            Value::NullInts(v) => v.len(),
            Value::NullFloats(v) => v.len(),
            Value::NullStrings(v) => v.len(),
            Value::NullTimes(v) => v.len(),
            _ => 1,
        }
    }

    /// Element `i` of a list as a scalar value.
    pub fn element(&self, i: usize) -> Option<Value> {
        match self {
            Value::Ints(v) => v.get(i).copied().map(Value::Int),
            Value::Uints(v) => v.get(i).copied().map(Value::Uint),
            Value::Floats(v) => v.get(i).copied().map(Value::Float),
            Value::Bools(v) => v.get(i).copied().map(Value::Bool),
            Value::Times(v) => v.get(i).copied().map(Value::Time),
            Value::Strings(v) => v.get(i).cloned().map(Value::String),
            Value::BytesList(v) => v.get(i).cloned().map(Value::Bytes),
            Value::NullInts(v) => v.get(i).map(|e| e.map(Value::Int).unwrap_or(Value::Null)),
            Value::NullFloats(v) => v.get(i).map(|e| e.map(Value::Float).unwrap_or(Value::Null)),
            Value::NullStrings(v) => v
                .get(i)
                .map(|e| e.clone().map(Value::String).unwrap_or(Value::Null)),
            Value::NullTimes(v) => v.get(i).map(|e| e.map(Value::Time).unwrap_or(Value::Null)),
            _ => None,
        }
    }

    /// Push the value, or each element of a list, onto `out`.
    pub fn flatten_into(&self, out: &mut Vec<Value>) {
        if self.is_list() {
            out.extend((0..self.arity()).filter_map(|i| self.element(i)));
        } else {
            out.push(self.clone());
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int64",
            Value::Uint(_) => "uint64",
            Value::Float(_) => "float64",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "time",
            Value::Ints(_) => "[]int64",
            Value::Uints(_) => "[]uint64",
            Value::Floats(_) => "[]float64",
            Value::Bools(_) => "[]bool",
            Value::Strings(_) => "[]string",
            Value::BytesList(_) => "[]bytes",
            Value::Times(_) => "[]time",
            Value::NullInts(_) => "[]null_int64",
            Value::NullFloats(_) => "[]null_float64",
            Value::NullStrings(_) => "[]null_string",
            Value::NullTimes(_) => "[]null_time",
            Value::Driver(d) => d.type_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_list() {
            write!(f, "[")?;
            for i in 0..self.arity() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if let Some(e) = self.element(i) {
                    write!(f, "{e}")?;
                }
            }
            return write!(f, "]");
        }
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Uint(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Driver(d) => write!(f, "<{}>", d.type_name()),
            _ => Ok(()),
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v.into())
            }
        })*
    };
}

impl_from! {
    i64 => Int,
    i32 => Int,
    i16 => Int,
    u64 => Uint,
    u32 => Uint,
    u16 => Uint,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    NaiveDateTime => Time,
    Vec<i64> => Ints,
    Vec<u64> => Uints,
    Vec<f64> => Floats,
    Vec<bool> => Bools,
    Vec<String> => Strings,
    Vec<Vec<u8>> => BytesList,
    Vec<NaiveDateTime> => Times,
    Vec<Option<i64>> => NullInts,
    Vec<Option<f64>> => NullFloats,
    Vec<Option<String>> => NullStrings,
    Vec<Option<NaiveDateTime>> => NullTimes,
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v.naive_utc())
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::Strings(v.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A value plus the optional name it binds to and an optional one-based
/// element selector.
///
/// A selector picks one element out of a list value, so a single list can
/// feed `BETWEEN ? AND ?` or a pre-expanded `IN (?,?,?)` group.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Value,
    pub position: usize,
}

impl Argument {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            value: value.into(),
            position: 0,
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
            position: 0,
        }
    }

    /// Select element `position` (one-based) of a list value.
    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// True when the argument will render as a list.
    pub fn is_list(&self) -> bool {
        self.position == 0 && self.value.is_list()
    }

    pub fn arity(&self) -> usize {
        if self.position > 0 { 1 } else { self.value.arity() }
    }

    /// The value the placeholder receives after applying the selector.
    pub fn resolve(&self) -> DmlResult<Value> {
        if self.position == 0 || !self.value.is_list() {
            return Ok(self.value.clone());
        }
        self.value.element(self.position - 1).ok_or_else(|| {
            DmlError::out_of_range(format!(
                "position {} selects beyond a {} of length {}",
                self.position,
                self.value.type_name(),
                self.value.arity()
            ))
        })
    }
}

/// Typed fluent setters shared by every builder that accepts values.
/// The including type provides `fn value(self, Value) -> Self`.
macro_rules! typed_values {
    () => {
        pub fn int64(self, v: i64) -> Self {
            self.value($crate::ast::Value::Int(v))
        }

        pub fn uint64(self, v: u64) -> Self {
            self.value($crate::ast::Value::Uint(v))
        }

        pub fn float64(self, v: f64) -> Self {
            self.value($crate::ast::Value::Float(v))
        }

        pub fn bool(self, v: bool) -> Self {
            self.value($crate::ast::Value::Bool(v))
        }

        pub fn str(self, v: impl Into<String>) -> Self {
            self.value($crate::ast::Value::String(v.into()))
        }

        pub fn bytes(self, v: impl Into<Vec<u8>>) -> Self {
            self.value($crate::ast::Value::Bytes(v.into()))
        }

        pub fn time(self, v: ::chrono::NaiveDateTime) -> Self {
            self.value($crate::ast::Value::Time(v))
        }

        pub fn null(self) -> Self {
            self.value($crate::ast::Value::Null)
        }

        pub fn null_int64(self, v: Option<i64>) -> Self {
            self.value(v.into())
        }

        pub fn null_float64(self, v: Option<f64>) -> Self {
            self.value(v.into())
        }

        pub fn null_string(self, v: Option<String>) -> Self {
            self.value(v.into())
        }

        pub fn null_time(self, v: Option<::chrono::NaiveDateTime>) -> Self {
            self.value(v.into())
        }

        pub fn int64s(self, v: impl IntoIterator<Item = i64>) -> Self {
            self.value($crate::ast::Value::Ints(v.into_iter().collect()))
        }

        pub fn uint64s(self, v: impl IntoIterator<Item = u64>) -> Self {
            self.value($crate::ast::Value::Uints(v.into_iter().collect()))
        }

        pub fn float64s(self, v: impl IntoIterator<Item = f64>) -> Self {
            self.value($crate::ast::Value::Floats(v.into_iter().collect()))
        }

        pub fn strs<S: Into<String>>(self, v: impl IntoIterator<Item = S>) -> Self {
            self.value($crate::ast::Value::Strings(
                v.into_iter().map(Into::into).collect(),
            ))
        }

        pub fn times(self, v: impl IntoIterator<Item = ::chrono::NaiveDateTime>) -> Self {
            self.value($crate::ast::Value::Times(v.into_iter().collect()))
        }
    };
}

pub(crate) use typed_values;

/// An ordered list of explicit arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    args: Vec<Argument>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, v: Value) -> Self {
        self.args.push(Argument::new(v));
        self
    }

    typed_values!();

    pub fn arg(self, v: impl Into<Value>) -> Self {
        self.value(v.into())
    }

    /// Add a value bound to the `:name` placeholder.
    pub fn named(mut self, name: impl Into<String>, v: impl Into<Value>) -> Self {
        self.args.push(Argument::named(name, v));
        self
    }

    pub fn push(&mut self, arg: Argument) {
        self.args.push(arg);
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) {
        self.args.extend(values.into_iter().map(Argument::new));
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.args.iter()
    }

    pub fn as_slice(&self) -> &[Argument] {
        &self.args
    }

    pub fn clear(&mut self) {
        self.args.clear();
    }

    pub fn truncate(&mut self, len: usize) {
        self.args.truncate(len);
    }

    /// First argument carrying exactly `name`.
    pub fn get_named(&self, name: &str) -> Option<&Argument> {
        self.args.iter().find(|a| a.name.as_deref() == Some(name))
    }

    pub fn has_named(&self) -> bool {
        self.args.iter().any(|a| a.name.is_some())
    }

    pub fn unnamed_count(&self) -> usize {
        self.args.iter().filter(|a| a.name.is_none()).count()
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self {
            args: values.into_iter().map(Argument::new).collect(),
        }
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.iter()
    }
}
