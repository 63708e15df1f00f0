//! Typed gene keys used to align per-sample count tables.
//!
//! Every annotation column gets a single [`KeyKind`] inferred from its values.
//! Keys are compared by typed value, so `"0042"` in an integer column matches
//! `"42"`. Integer and decimal columns widen to decimal when files disagree,
//! while a column that is numeric in one file and free text in another is
//! rejected instead of being coerced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Value type of one annotation column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    /// Every value parses as a signed integer.
    Integer,
    /// Every value parses as a finite decimal number.
    Decimal,
    /// Anything else.
    Text,
}

impl KeyKind {
    /// Infer the narrowest kind that accepts every value.
    ///
    /// An empty column is classified as text.
    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut kind = KeyKind::Integer;
        let mut seen = false;
        for raw in values {
            seen = true;
            let raw = raw.trim();
            if kind == KeyKind::Integer && raw.parse::<i64>().is_err() {
                kind = KeyKind::Decimal;
            }
            if kind == KeyKind::Decimal && !raw.parse::<f64>().map_or(false, f64::is_finite) {
                return KeyKind::Text;
            }
        }
        if seen {
            kind
        } else {
            KeyKind::Text
        }
    }

    /// Common kind of two columns holding the same annotation.
    ///
    /// Integer widens to decimal. Returns `None` for numeric vs text.
    pub fn unify(self, other: KeyKind) -> Option<KeyKind> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (KeyKind::Integer, KeyKind::Decimal) | (KeyKind::Decimal, KeyKind::Integer) => {
                Some(KeyKind::Decimal)
            }
            _ => None,
        }
    }

    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            KeyKind::Integer => "integer",
            KeyKind::Decimal => "decimal",
            KeyKind::Text => "text",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed annotation value.
#[derive(Debug, Clone)]
pub enum KeyValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl KeyValue {
    /// Parse a raw field as the given kind.
    pub fn parse(raw: &str, kind: KeyKind) -> Option<Self> {
        let trimmed = raw.trim();
        match kind {
            KeyKind::Integer => trimmed.parse().ok().map(KeyValue::Integer),
            KeyKind::Decimal => trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(KeyValue::Decimal),
            KeyKind::Text => Some(KeyValue::Text(trimmed.to_string())),
        }
    }

    /// Re-express the value as `kind`, widening integers to decimals.
    pub fn widen(&self, kind: KeyKind) -> KeyValue {
        match (self, kind) {
            (KeyValue::Integer(v), KeyKind::Decimal) => KeyValue::Decimal(*v as f64),
            _ => self.clone(),
        }
    }

    /// Numeric value, if the key is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            KeyValue::Integer(v) => Some(*v as f64),
            KeyValue::Decimal(v) => Some(*v),
            KeyValue::Text(_) => None,
        }
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyValue::Integer(a), KeyValue::Integer(b)) => a == b,
            (KeyValue::Decimal(a), KeyValue::Decimal(b)) => a.to_bits() == b.to_bits(),
            (KeyValue::Text(a), KeyValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for KeyValue {}

impl Hash for KeyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            KeyValue::Integer(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            KeyValue::Decimal(v) => {
                1u8.hash(state);
                v.to_bits().hash(state);
            }
            KeyValue::Text(v) => {
                2u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Integer(v) => write!(f, "{}", v),
            KeyValue::Decimal(v) => write!(f, "{}", v),
            KeyValue::Text(v) => f.write_str(v),
        }
    }
}

/// Composite key of a gene row: one value per annotation column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneKey(Vec<KeyValue>);

impl GeneKey {
    pub fn new(values: Vec<KeyValue>) -> Self {
        Self(values)
    }

    /// Build a single-column text key.
    pub fn text(id: &str) -> Self {
        Self(vec![KeyValue::Text(id.to_string())])
    }

    #[inline]
    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, column: usize) -> Option<&KeyValue> {
        self.0.get(column)
    }

    /// Widen every value to the matching column kind.
    pub fn widen(&self, kinds: &[KeyKind]) -> GeneKey {
        GeneKey(
            self.0
                .iter()
                .zip(kinds)
                .map(|(value, &kind)| value.widen(kind))
                .collect(),
        )
    }
}

impl fmt::Display for GeneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_kinds() {
        assert_eq!(KeyKind::infer(["1", "20", "-3"]), KeyKind::Integer);
        assert_eq!(KeyKind::infer(["1", "2.5"]), KeyKind::Decimal);
        assert_eq!(KeyKind::infer(["ENSG01", "2"]), KeyKind::Text);
        assert_eq!(KeyKind::infer(["inf"]), KeyKind::Text);
        assert_eq!(KeyKind::infer(Vec::<&str>::new()), KeyKind::Text);
    }

    #[test]
    fn test_integer_keys_compare_by_value() {
        let a = KeyValue::parse("0042", KeyKind::Integer).unwrap();
        let b = KeyValue::parse("42", KeyKind::Integer).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kinds_never_compare_equal() {
        let int = KeyValue::parse("7", KeyKind::Integer).unwrap();
        let text = KeyValue::parse("7", KeyKind::Text).unwrap();
        assert_ne!(int, text);
    }

    #[test]
    fn test_unify_widens_numeric_kinds() {
        assert_eq!(KeyKind::Integer.unify(KeyKind::Integer), Some(KeyKind::Integer));
        assert_eq!(KeyKind::Integer.unify(KeyKind::Decimal), Some(KeyKind::Decimal));
        assert_eq!(KeyKind::Decimal.unify(KeyKind::Integer), Some(KeyKind::Decimal));
        assert_eq!(KeyKind::Integer.unify(KeyKind::Text), None);
        assert_eq!(KeyKind::Text.unify(KeyKind::Decimal), None);
    }

    #[test]
    fn test_widened_integer_matches_decimal() {
        let int = KeyValue::parse("100", KeyKind::Integer).unwrap();
        let dec = KeyValue::parse("100.0", KeyKind::Decimal).unwrap();
        assert_ne!(int, dec);
        assert_eq!(int.widen(KeyKind::Decimal), dec);

        let key = GeneKey::new(vec![KeyValue::Text("A".into()), int]);
        let widened = key.widen(&[KeyKind::Text, KeyKind::Decimal]);
        assert_eq!(widened, GeneKey::new(vec![KeyValue::Text("A".into()), dec]));
        assert_eq!(widened.to_string(), "A|100");
    }

    #[test]
    fn test_decimal_rejects_text() {
        assert!(KeyValue::parse("abc", KeyKind::Decimal).is_none());
        assert_eq!(
            KeyValue::parse("1.50", KeyKind::Decimal).and_then(|v| v.as_f64()),
            Some(1.5)
        );
    }

    #[test]
    fn test_display_joins_columns() {
        let key = GeneKey::new(vec![
            KeyValue::Text("TP53".into()),
            KeyValue::Integer(2512),
        ]);
        assert_eq!(key.to_string(), "TP53|2512");
        assert_eq!(key.len(), 2);
    }
}
