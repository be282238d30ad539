//! Declarative matcher for delimited text sentences.
//!
//! A sentence grammar is an ordered list of typed field specs instead
//! of hand-written splitting: optional fields cover trailing groups
//! that differ between firmware revisions, and alternation is a list
//! of patterns tried in order. Matching validates every column, so a
//! decoder only ever sees values that already parsed.

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Column must equal this text exactly.
    Literal(&'static str),
    /// Column must start with this prefix; the captured value is the
    /// remainder (e.g. `imei:` identifiers).
    Prefix(&'static str),
    /// Decimal integer, optional sign.
    Int,
    /// Decimal floating point number.
    Float,
    /// Hexadecimal integer.
    HexInt,
    /// Column must be one of the listed alternatives.
    OneOf(&'static [&'static str]),
    /// Any content, captured verbatim.
    Any,
}

impl FieldKind {
    fn capture(&self, column: &str) -> Option<String> {
        match self {
            FieldKind::Literal(text) => (column == *text).then(|| column.to_string()),
            FieldKind::Prefix(prefix) => column
                .strip_prefix(prefix)
                .map(|remainder| remainder.to_string()),
            FieldKind::Int => {
                let digits = column.strip_prefix(['+', '-']).unwrap_or(column);
                (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                    .then(|| column.to_string())
            }
            FieldKind::Float => column.parse::<f64>().ok().map(|_| column.to_string()),
            FieldKind::HexInt => i64::from_str_radix(column, 16).ok().map(|_| column.to_string()),
            FieldKind::OneOf(options) => options.contains(&column).then(|| column.to_string()),
            FieldKind::Any => Some(column.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Field {
    kind: FieldKind,
    optional: bool,
}

/// Positional grammar over one delimiter.
#[derive(Debug, Clone)]
pub struct SentencePattern {
    delimiter: char,
    fields: Vec<Field>,
    allow_trailing: bool,
}

impl SentencePattern {
    pub fn new(delimiter: char) -> Self {
        SentencePattern {
            delimiter,
            fields: Vec::new(),
            allow_trailing: false,
        }
    }

    pub fn field(mut self, kind: FieldKind) -> Self {
        self.fields.push(Field {
            kind,
            optional: false,
        });
        self
    }

    /// Optional column: an absent or empty column yields `None` from
    /// the match without failing it; a non-matching, non-empty column
    /// is offered to the next field.
    pub fn optional(mut self, kind: FieldKind) -> Self {
        self.fields.push(Field {
            kind,
            optional: true,
        });
        self
    }

    /// Tolerate extra columns after the last field.
    pub fn allow_trailing(mut self) -> Self {
        self.allow_trailing = true;
        self
    }

    pub fn matches(&self, sentence: &str) -> Option<SentenceMatch> {
        let columns: Vec<&str> = sentence.split(self.delimiter).collect();
        let mut values = Vec::with_capacity(self.fields.len());
        let mut col = 0;

        for field in &self.fields {
            match columns.get(col) {
                Some(&column) => {
                    if let Some(value) = field.kind.capture(column) {
                        values.push(Some(value));
                        col += 1;
                    } else if field.optional {
                        values.push(None);
                        if column.is_empty() {
                            col += 1;
                        }
                    } else {
                        return None;
                    }
                }
                None => {
                    if !field.optional {
                        return None;
                    }
                    values.push(None);
                }
            }
        }

        if col < columns.len() && !self.allow_trailing {
            return None;
        }
        Some(SentenceMatch { values, cursor: 0 })
    }
}

/// Alternation: the first pattern that matches wins. Firmware
/// revisions of the same protocol commonly differ in column count.
pub fn first_match(patterns: &[SentencePattern], sentence: &str) -> Option<SentenceMatch> {
    patterns.iter().find_map(|pattern| pattern.matches(sentence))
}

/// Captured columns with a positional cursor.
pub struct SentenceMatch {
    values: Vec<Option<String>>,
    cursor: usize,
}

impl SentenceMatch {
    pub fn next_str(&mut self) -> Option<String> {
        let value = self.values.get(self.cursor).cloned().flatten();
        self.cursor += 1;
        value
    }

    pub fn next_int(&mut self) -> Option<i64> {
        self.next_str().and_then(|value| value.parse().ok())
    }

    pub fn next_f64(&mut self) -> Option<f64> {
        self.next_str().and_then(|value| value.parse().ok())
    }

    pub fn next_hex(&mut self) -> Option<i64> {
        self.next_str()
            .and_then(|value| i64::from_str_radix(&value, 16).ok())
    }

    pub fn skip(&mut self, count: usize) {
        self.cursor += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_pattern() -> SentencePattern {
        SentencePattern::new(',')
            .field(FieldKind::Prefix("imei:"))
            .field(FieldKind::Any)
            .field(FieldKind::OneOf(&["A", "V"]))
            .field(FieldKind::Float)
            .field(FieldKind::OneOf(&["N", "S"]))
            .optional(FieldKind::Float)
            .allow_trailing()
    }

    #[test]
    fn captures_typed_columns_in_order() {
        let mut m = fix_pattern()
            .matches("imei:359586015829802,tracker,A,2234.4669,N,12.5,extra")
            .expect("match");
        assert_eq!(m.next_str().as_deref(), Some("359586015829802"));
        assert_eq!(m.next_str().as_deref(), Some("tracker"));
        assert_eq!(m.next_str().as_deref(), Some("A"));
        assert_eq!(m.next_f64(), Some(2234.4669));
        assert_eq!(m.next_str().as_deref(), Some("N"));
        assert_eq!(m.next_f64(), Some(12.5));
    }

    #[test]
    fn optional_column_may_be_absent() {
        let mut m = fix_pattern()
            .matches("imei:359586015829802,tracker,A,2234.4669,N")
            .expect("match");
        m.skip(5);
        assert_eq!(m.next_f64(), None);
    }

    #[test]
    fn empty_optional_column_is_consumed() {
        let pattern = SentencePattern::new(',')
            .field(FieldKind::Int)
            .optional(FieldKind::Float)
            .field(FieldKind::Literal("end"));
        let mut m = pattern.matches("7,,end").expect("match");
        assert_eq!(m.next_int(), Some(7));
        assert_eq!(m.next_f64(), None);
        assert_eq!(m.next_str().as_deref(), Some("end"));
    }

    #[test]
    fn required_mismatch_fails() {
        assert!(fix_pattern()
            .matches("imei:359586015829802,tracker,X,2234.4669,N")
            .is_none());
        assert!(fix_pattern().matches("12345,tracker,A,1.0,N").is_none());
    }

    #[test]
    fn trailing_columns_rejected_unless_allowed() {
        let strict = SentencePattern::new(',').field(FieldKind::Int);
        assert!(strict.matches("1,2").is_none());
        assert!(strict.allow_trailing().matches("1,2").is_some());
    }

    #[test]
    fn alternation_picks_first_matching_revision() {
        let long = SentencePattern::new(',')
            .field(FieldKind::Int)
            .field(FieldKind::Float)
            .field(FieldKind::Float);
        let short = SentencePattern::new(',')
            .field(FieldKind::Int)
            .field(FieldKind::Float);
        let patterns = [long, short];

        let mut m = first_match(&patterns, "1,2.0").expect("short revision");
        assert_eq!(m.next_int(), Some(1));
        assert!(first_match(&patterns, "1,2.0,3.0").is_some());
    }
}
