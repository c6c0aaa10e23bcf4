//! Property values and their ordering and hashing wrappers.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A dynamically-typed property value.
///
/// Vertices store one `Value` per property attribute. Strings use `ArcStr`
/// and binary data and lists use shared slices, so cloning a value out of a
/// stored vertex is cheap.
///
/// # Examples
///
/// ```
/// use revgraph_common::types::Value;
///
/// let name = Value::from("Alice");
/// let age = Value::from(30i64);
///
/// assert_eq!(name.as_str(), Some("Alice"));
/// assert_eq!(age.as_int64(), Some(30));
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int64(i64),

    /// 64-bit floating point
    Float64(f64),

    /// UTF-8 string
    String(ArcStr),

    /// Binary data
    Bytes(Arc<[u8]>),

    /// Ordered list of values
    List(Arc<[Value]>),
}

impl Value {
    /// Returns `true` if this value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a Bool.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value if this is an Int64.
    #[inline]
    #[must_use]
    pub const fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float value if this is a Float64.
    #[inline]
    #[must_use]
    pub const fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string value if this is a String.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes if this is a Bytes value.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the elements if this is a List.
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the type name of this value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int64(_) => "INT64",
            Value::Float64(_) => "FLOAT64",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::List(_) => "LIST",
        }
    }

    /// Returns `true` for Int64 and Float64.
    #[inline]
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Value::Int64(_) | Value::Float64(_))
    }

    /// Compares two values of the same family.
    ///
    /// Bools compare with bools, strings with strings, and Int64/Float64
    /// compare numerically with each other (NaN sorts above every number).
    /// Returns `None` for values of different families, nulls, bytes and
    /// lists. This is the order the query plan and the ordered indices share.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float64(a), Value::Float64(b)) => {
                Some(OrderedFloat64(*a).cmp(&OrderedFloat64(*b)))
            }
            (Value::Int64(a), Value::Float64(b)) => Some(cmp_int_float(*a, *b)),
            (Value::Float64(a), Value::Int64(b)) => Some(cmp_int_float(*b, *a).reverse()),
            (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }

    /// Equality under the same rules as [`Value::compare`], extended to
    /// bytes and lists (compared structurally). Null is equal to nothing.
    #[must_use]
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.matches(y))
            }
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

/// Exact comparison of an integer with a float, without losing precision
/// for integers above 2^53.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => {
            let frac = f - whole;
            if frac > 0.0 {
                Ordering::Less
            } else if frac < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        ord => ord,
    }
}

/// Returns the float as an i64 when it holds an exact integer.
fn integral_float(f: f64) -> Option<i64> {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_finite() && f.trunc() == f && (-TWO_POW_63..TWO_POW_63).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int64(i) => write!(f, "Int64({i})"),
            Value::Float64(fl) => write!(f, "Float64({fl})"),
            Value::String(s) => write!(f, "String({:?})", s.as_str()),
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::List(l) => write!(f, "List({l:?})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int64(i) => write!(f, "{i}"),
            Value::Float64(fl) => write!(f, "{fl}"),
            Value::String(s) => write!(f, "{:?}", s.as_str()),
            Value::Bytes(b) => write!(f, "<bytes: {} bytes>", b.len()),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int64(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<ArcStr> for Value {
    fn from(s: ArcStr) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A wrapper around `f64` that implements `Ord` with total ordering.
///
/// NaN values are treated as greater than all other values (including
/// infinity) and equal to each other. Negative zero equals positive zero.
#[derive(Clone, Copy, Debug)]
pub struct OrderedFloat64(pub f64);

impl PartialEq for OrderedFloat64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedFloat64 {}

impl PartialOrd for OrderedFloat64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat64 {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
        }
    }
}

/// An orderable index key.
///
/// Only bools, numbers and strings have an order. Numbers of both
/// representations live in one domain, so `21` and `21.0` are the same key.
/// Across families the order is Bool < numbers < String, which only matters
/// for the internal layout of a B-tree holding mixed data.
#[derive(Clone, Debug)]
pub enum OrderableValue {
    /// Boolean (false < true)
    Bool(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit float with total ordering
    Float64(OrderedFloat64),
    /// UTF-8 string
    String(ArcStr),
}

impl OrderableValue {
    /// Attempts to create an `OrderableValue` from a `Value`.
    ///
    /// Returns `None` for `Null`, `Bytes` and `List`.
    #[must_use]
    pub fn try_from(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Int64(i) => Some(Self::Int64(*i)),
            Value::Float64(f) => Some(Self::Float64(OrderedFloat64(*f))),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Null | Value::Bytes(_) | Value::List(_) => None,
        }
    }

    /// Converts back into a `Value`.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Int64(i) => Value::Int64(i),
            Self::Float64(f) => Value::Float64(f.0),
            Self::String(s) => Value::String(s),
        }
    }

    const fn family(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int64(_) | Self::Float64(_) => 1,
            Self::String(_) => 2,
        }
    }
}

impl PartialEq for OrderableValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderableValue {}

impl PartialOrd for OrderableValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderableValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Float64(a), Self::Float64(b)) => a.cmp(b),
            (Self::Int64(a), Self::Float64(b)) => cmp_int_float(*a, b.0),
            (Self::Float64(a), Self::Int64(b)) => cmp_int_float(*b, a.0).reverse(),
            (Self::String(a), Self::String(b)) => a.as_str().cmp(b.as_str()),
            _ => self.family().cmp(&other.family()),
        }
    }
}

/// A hashable wrapper around [`Value`] for hash-based indices.
///
/// Equality follows [`Value::matches`] and hashing is consistent with it:
/// integral floats hash like the equivalent integer, every NaN hashes alike,
/// and `-0.0` hashes like `0`.
#[derive(Clone, Debug)]
pub struct HashableValue(pub Value);

impl HashableValue {
    /// Wraps a value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns a reference to the inner value.
    #[must_use]
    pub fn inner(&self) -> &Value {
        &self.0
    }

    /// Consumes the wrapper and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl PartialEq for HashableValue {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Null, Value::Null) => true,
            (Value::Float64(a), Value::Float64(b)) if a.is_nan() && b.is_nan() => true,
            (a, b) => a.matches(b),
        }
    }
}

impl Eq for HashableValue {}

impl Hash for HashableValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Int64(i) => {
            2u8.hash(state);
            i.hash(state);
        }
        Value::Float64(f) => match integral_float(*f) {
            Some(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            None => {
                3u8.hash(state);
                if f.is_nan() {
                    f64::NAN.to_bits().hash(state);
                } else {
                    f.to_bits().hash(state);
                }
            }
        },
        Value::String(s) => {
            4u8.hash(state);
            s.as_str().hash(state);
        }
        Value::Bytes(b) => {
            5u8.hash(state);
            b.hash(state);
        }
        Value::List(l) => {
            6u8.hash(state);
            l.len().hash(state);
            for v in l.iter() {
                hash_value(v, state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &HashableValue) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_value_type_checks() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());
        assert_eq!(Value::Int64(42).as_int64(), Some(42));
        assert_eq!(Value::Int64(42).as_float64(), None);
        assert_eq!(Value::from("x").type_name(), "STRING");
    }

    #[test]
    fn test_compare_same_family() {
        assert_eq!(Value::from(21i64).compare(&Value::from(30i64)), Some(Ordering::Less));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::Bool(false).compare(&Value::Bool(true)), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_cross_numeric() {
        assert_eq!(Value::from(21i64).compare(&Value::from(21.0)), Some(Ordering::Equal));
        assert_eq!(Value::from(21i64).compare(&Value::from(21.5)), Some(Ordering::Less));
        assert_eq!(Value::from(-3.5).compare(&Value::from(-3i64)), Some(Ordering::Less));
        assert_eq!(Value::from(i64::MAX).compare(&Value::from(f64::NAN)), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_incompatible_families() {
        assert_eq!(Value::from(1i64).compare(&Value::from("1")), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert_eq!(Value::Bool(true).compare(&Value::from(1i64)), None);
        assert!(!Value::Null.matches(&Value::Null));
    }

    #[test]
    fn test_large_integers_stay_exact() {
        let big = (1i64 << 53) + 1;
        let as_float = Value::Float64((1i64 << 53) as f64);
        assert_eq!(Value::Int64(big).compare(&as_float), Some(Ordering::Greater));
    }

    #[test]
    fn test_hashable_numeric_normalization() {
        let a = HashableValue::new(Value::Int64(21));
        let b = HashableValue::new(Value::Float64(21.0));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let z = HashableValue::new(Value::Float64(-0.0));
        assert_eq!(z, HashableValue::new(Value::Int64(0)));
        assert_eq!(hash_of(&z), hash_of(&HashableValue::new(Value::Int64(0))));
    }

    #[test]
    fn test_orderable_btree_order() {
        let mut set = BTreeSet::new();
        for v in [Value::from(30i64), Value::from(10.5), Value::from(21i64), Value::from(21.0)] {
            set.insert(OrderableValue::try_from(&v).unwrap());
        }
        let ordered: Vec<Value> = set.into_iter().map(OrderableValue::into_value).collect();
        assert_eq!(ordered.len(), 3);
        assert_eq!(ordered[0], Value::Float64(10.5));
        assert_eq!(ordered[2], Value::Int64(30));
    }

    #[test]
    fn test_orderable_rejects_unordered_types() {
        assert!(OrderableValue::try_from(&Value::Null).is_none());
        assert!(OrderableValue::try_from(&Value::from(vec![1u8, 2])).is_none());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_orderable_agrees_with_compare(a in -1000i64..1000, b in -1000.0f64..1000.0) {
                let va = Value::Int64(a);
                let vb = Value::Float64(b);
                let ord = OrderableValue::try_from(&va)
                    .unwrap()
                    .cmp(&OrderableValue::try_from(&vb).unwrap());
                prop_assert_eq!(Some(ord), va.compare(&vb));
            }

            #[test]
            fn test_equal_values_hash_alike(a in -1000i64..1000) {
                let int = HashableValue::new(Value::Int64(a));
                let float = HashableValue::new(Value::Float64(a as f64));
                prop_assert_eq!(&int, &float);
                prop_assert_eq!(hash_of(&int), hash_of(&float));
            }
        }
    }
}
