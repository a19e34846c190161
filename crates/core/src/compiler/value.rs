//! Dynamic values produced by constant-expression compilation.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// A compiled value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(PhpString),
    Array(PhpArray),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !(s.is_empty() || s.as_bytes() == b"0"),
            Value::Array(a) => !a.is_empty(),
        }
    }

    /// String conversion as performed by the host's `(string)` cast.
    pub fn to_php_string(&self) -> PhpString {
        match self {
            Value::Null | Value::Bool(false) => PhpString::default(),
            Value::Bool(true) => PhpString::from("1"),
            Value::Int(i) => PhpString::from(i.to_string()),
            Value::Float(f) => PhpString::from(format_float(*f)),
            Value::String(s) => s.clone(),
            Value::Array(_) => PhpString::from("Array"),
        }
    }

    pub fn as_php_string(&self) -> Option<&PhpString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&PhpArray> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_php_string(), f)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(PhpString::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(PhpString::from(value))
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::String(PhpString::from(value))
    }
}

impl From<PhpString> for Value {
    fn from(value: PhpString) -> Self {
        Value::String(value)
    }
}

impl From<PhpArray> for Value {
    fn from(value: PhpArray) -> Self {
        Value::Array(value)
    }
}

/// Byte string. The host's strings carry no encoding, so `"\xFF"` is one
/// byte and source text that is not UTF-8 survives unchanged.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhpString(Vec<u8>);

impl PhpString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// UTF-8 view; invalid sequences become U+FFFD.
    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn concat(&self, other: &PhpString) -> PhpString {
        let mut bytes = Vec::with_capacity(self.len() + other.len());
        bytes.extend_from_slice(&self.0);
        bytes.extend_from_slice(&other.0);
        PhpString(bytes)
    }
}

impl fmt::Debug for PhpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.escape_ascii())
    }
}

impl fmt::Display for PhpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

impl From<&str> for PhpString {
    fn from(value: &str) -> Self {
        PhpString(value.as_bytes().to_vec())
    }
}

impl From<String> for PhpString {
    fn from(value: String) -> Self {
        PhpString(value.into_bytes())
    }
}

impl From<Vec<u8>> for PhpString {
    fn from(value: Vec<u8>) -> Self {
        PhpString(value)
    }
}

impl From<&[u8]> for PhpString {
    fn from(value: &[u8]) -> Self {
        PhpString(value.to_vec())
    }
}

/// Format a float with 14 significant digits, as the host does.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let formatted = format!("{value:.13e}");
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if mantissa.starts_with('-') { "-" } else { "" };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    if !(-4..14).contains(&exponent) {
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() { "0" } else { rest };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{sign}{first}.{rest}E{exp_sign}{}", exponent.abs())
    } else if exponent < 0 {
        let zeros = "0".repeat((-exponent - 1) as usize);
        format!("{sign}0.{zeros}{digits}")
    } else {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            format!("{sign}{digits}{}", "0".repeat(int_len - digits.len()))
        } else {
            format!("{sign}{}.{}", &digits[..int_len], &digits[int_len..])
        }
    }
}

/// Integer or float, after numeric conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Self {
        match number {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

fn is_numeric_whitespace(byte: &u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

/// Parse the numeric prefix of `text`. The flag is true when the whole
/// string (surrounding whitespace aside) is numeric.
pub fn parse_numeric(text: &[u8]) -> Option<(Number, bool)> {
    let start = text.iter().position(|b| !is_numeric_whitespace(b)).unwrap_or(text.len());
    let bytes = &text[start..];
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut int_digits = end - int_start;
    let mut is_float = false;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if int_digits > 0 || frac_end > frac_start {
            int_digits += frac_end - frac_start;
            end = frac_end;
            is_float = true;
        }
    }
    if int_digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
            is_float = true;
        }
    }

    let literal = std::str::from_utf8(&bytes[..end]).ok()?;
    let whole = bytes[end..].iter().all(is_numeric_whitespace);
    let number = if is_float {
        Number::Float(literal.parse().ok()?)
    } else {
        match literal.parse::<i64>() {
            Ok(i) => Number::Int(i),
            Err(_) => Number::Float(literal.parse().ok()?),
        }
    };
    Some((number, whole))
}

/// Key of an array entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    Int(i64),
    String(PhpString),
}

impl ArrayKey {
    /// Strings holding a canonical decimal integer become integer keys.
    pub fn from_string(key: &PhpString) -> Self {
        let bytes = key.as_bytes();
        let digits = bytes.strip_prefix(b"-").unwrap_or(bytes);
        let canonical = if digits.len() < bytes.len() {
            !digits.is_empty() && digits[0] != b'0'
        } else {
            bytes == b"0" || !bytes.starts_with(b"0")
        };
        if canonical && !digits.is_empty() && digits.iter().all(u8::is_ascii_digit) {
            let parsed = std::str::from_utf8(bytes).ok().and_then(|text| text.parse::<i64>().ok());
            if let Some(i) = parsed {
                return ArrayKey::Int(i);
            }
        }
        ArrayKey::String(key.clone())
    }

    /// Normalize a value used as a key; `None` for arrays.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => ArrayKey::String(PhpString::default()),
            Value::Bool(b) => ArrayKey::Int(i64::from(*b)),
            Value::Int(i) => ArrayKey::Int(*i),
            Value::Float(f) if f.is_finite() => ArrayKey::Int(f.trunc() as i64),
            Value::Float(_) => ArrayKey::Int(0),
            Value::String(s) => ArrayKey::from_string(s),
            Value::Array(_) => return None,
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            ArrayKey::Int(i) => Value::Int(*i),
            ArrayKey::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for ArrayKey {
    fn from(value: i64) -> Self {
        ArrayKey::Int(value)
    }
}

impl From<&str> for ArrayKey {
    fn from(value: &str) -> Self {
        ArrayKey::from_string(&PhpString::from(value))
    }
}

/// Insertion-ordered map with the host's next-free-index rule.
#[derive(Debug, Clone, Default)]
pub struct PhpArray {
    entries: Vec<(ArrayKey, Value)>,
    positions: HashMap<ArrayKey, usize>,
    next_index: Option<i64>,
}

impl PartialEq for PhpArray {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl PhpArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequentially keyed array.
    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        let mut array = Self::new();
        for value in values {
            array.push(value);
        }
        array
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.positions.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn contains_key(&self, key: &ArrayKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Insert or overwrite; an overwritten entry keeps its position.
    pub fn insert(&mut self, key: ArrayKey, value: Value) {
        if let ArrayKey::Int(i) = key {
            let next = i.saturating_add(1);
            self.next_index = Some(self.next_index.map_or(next, |current| current.max(next)));
        }
        match self.positions.get(&key) {
            Some(&idx) => self.entries[idx].1 = value,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Append with the next free integer key.
    pub fn push(&mut self, value: Value) {
        let key = self.next_index.unwrap_or(0);
        self.insert(ArrayKey::Int(key), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArrayKey, &Value)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_use_fourteen_significant_digits() {
        assert_eq!(format_float(0.1 + 0.2), "0.3");
        assert_eq!(format_float(1e25), "1.0E+25");
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(100.0), "100");
        assert_eq!(format_float(-0.00001), "-1.0E-5");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(f64::INFINITY), "INF");
        assert_eq!(format_float(f64::NAN), "NAN");
    }

    #[test]
    fn numeric_strings() {
        assert_eq!(parse_numeric(b"42"), Some((Number::Int(42), true)));
        assert_eq!(parse_numeric(b"  1.5e3 "), Some((Number::Float(1500.0), true)));
        assert_eq!(parse_numeric(b"12abc"), Some((Number::Int(12), false)));
        assert_eq!(parse_numeric(b".5"), Some((Number::Float(0.5), true)));
        assert_eq!(parse_numeric(b"abc"), None);
        assert_eq!(parse_numeric(b""), None);
        assert_eq!(parse_numeric(b"0x1A"), Some((Number::Int(0), false)));
        assert_eq!(parse_numeric(b"7\xFF"), Some((Number::Int(7), false)));
    }

    #[test]
    fn array_keys_are_normalized() {
        assert_eq!(ArrayKey::from_value(&Value::from("7")), Some(ArrayKey::Int(7)));
        assert_eq!(ArrayKey::from_value(&Value::from("07")), Some(ArrayKey::from("07")));
        assert_eq!(ArrayKey::from_value(&Value::from("-3")), Some(ArrayKey::Int(-3)));
        assert_eq!(ArrayKey::from_value(&Value::Bool(true)), Some(ArrayKey::Int(1)));
        assert_eq!(ArrayKey::from_value(&Value::Float(2.9)), Some(ArrayKey::Int(2)));
        assert_eq!(ArrayKey::from_value(&Value::Null), Some(ArrayKey::String(PhpString::default())));
        assert_eq!(ArrayKey::from_value(&Value::Array(PhpArray::new())), None);
    }

    #[test]
    fn push_continues_after_the_largest_integer_key() {
        let mut array = PhpArray::new();
        array.insert(ArrayKey::Int(5), Value::from("a"));
        array.insert(ArrayKey::from("x"), Value::from("b"));
        array.push(Value::from("c"));
        assert_eq!(array.get(&ArrayKey::Int(6)), Some(&Value::from("c")));

        array.insert(ArrayKey::Int(5), Value::from("z"));
        let keys: Vec<_> = array.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys[0], ArrayKey::Int(5));
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn strings_are_bytes() {
        let high = Value::from(vec![0xFF]);
        assert_eq!(high.as_php_string().map(PhpString::len), Some(1));
        assert_ne!(high, Value::from("\u{FF}"));
        assert_eq!(format!("{:?}", PhpString::from(vec![b'a', 0xFF])), "\"a\\xff\"");
        assert_eq!(
            Value::from("x").to_php_string().concat(&Value::Float(1.5).to_php_string()),
            PhpString::from("x1.5")
        );
    }
}
