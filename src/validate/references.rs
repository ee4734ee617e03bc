//! Metric reference extraction
//!
//! Consumer components reference schema fields through JSX-like tags:
//!
//! ```text
//! <MetricCell sensorType="depth" metricKey="depth.avg" />
//! ```
//!
//! The scanner reads every tag's own attributes (either order, any of
//! `"x"`, `'x'`, `{'x'}`, `{"x"}` or a plain template literal) and pairs the
//! sensor type with the metric key. Attributes belonging to tags nested in
//! attribute expressions are attributed to the nested tag, not the outer one.

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::syntax::line_number;

pub const DEFAULT_SENSOR_ATTRIBUTE: &str = "sensorType";
pub const DEFAULT_METRIC_ATTRIBUTE: &str = "metricKey";

/// Derived-view qualifiers appended to a base metric key
pub const DEFAULT_VIRTUAL_SUFFIXES: &[&str] = &["min", "max", "avg"];

/// Strip one trailing `.min`, `.max` or `.avg` (or any configured suffix)
pub fn normalize_metric_key<'a, S: AsRef<str>>(key: &'a str, suffixes: &[S]) -> &'a str {
    for suffix in suffixes {
        let base = key
            .strip_suffix(suffix.as_ref())
            .and_then(|rest| rest.strip_suffix('.'));
        if let Some(base) = base.filter(|b| !b.is_empty()) {
            return base;
        }
    }
    key
}

/// A literal `(sensorType, metricKey)` usage site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricReference {
    pub file: String,
    pub sensor_type: String,
    /// Key as written, suffix included
    pub metric_key: String,
    /// Key with any virtual suffix removed
    pub base_key: String,
    pub line: usize,
}

/// A usage site whose metric key is computed at runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpressionReference {
    pub file: String,
    pub sensor_type: String,
    pub expression: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub references: Vec<MetricReference>,
    pub expressions: Vec<ExpressionReference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeValue {
    Literal(String),
    Expression(String),
    /// Attribute written without a value
    Flag,
}

/// Extracts metric references from consumer source text
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    sensor_attribute: String,
    metric_attribute: String,
    suffixes: Vec<String>,
    tag_start: Regex,
}

impl Default for ReferenceScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceScanner {
    pub fn new() -> Self {
        Self {
            sensor_attribute: DEFAULT_SENSOR_ATTRIBUTE.to_string(),
            metric_attribute: DEFAULT_METRIC_ATTRIBUTE.to_string(),
            suffixes: DEFAULT_VIRTUAL_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            tag_start: Regex::new(r"<[A-Za-z][\w.]*").expect("tag pattern is valid"),
        }
    }

    pub fn with_attributes(mut self, sensor: impl Into<String>, metric: impl Into<String>) -> Self {
        self.sensor_attribute = sensor.into();
        self.metric_attribute = metric.into();
        self
    }

    pub fn with_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn scan(&self, file: &str, src: &str) -> ScanResult {
        let mut result = ScanResult::default();

        for tag in self.tag_start.find_iter(src) {
            let attributes = tag_attributes(&src[tag.end()..]);
            let sensor = attributes
                .iter()
                .find(|(name, _)| *name == self.sensor_attribute)
                .map(|(_, v)| v);
            let metric = attributes
                .iter()
                .find(|(name, _)| *name == self.metric_attribute)
                .map(|(_, v)| v);

            let line = line_number(src, tag.start());
            match (sensor, metric) {
                (Some(AttributeValue::Literal(sensor)), Some(AttributeValue::Literal(metric))) => {
                    let base = normalize_metric_key(metric, &self.suffixes);
                    result.references.push(MetricReference {
                        file: file.to_string(),
                        sensor_type: sensor.clone(),
                        metric_key: metric.clone(),
                        base_key: base.to_string(),
                        line,
                    });
                }
                (Some(AttributeValue::Literal(sensor)), Some(AttributeValue::Expression(expr))) => {
                    result.expressions.push(ExpressionReference {
                        file: file.to_string(),
                        sensor_type: sensor.clone(),
                        expression: expr.clone(),
                        line,
                    });
                }
                (Some(_), Some(_)) => {
                    debug!(file, line, "sensor type is not a literal, reference not checked");
                }
                _ => {}
            }
        }

        result
    }
}

/// Attributes of the tag whose name ends right before `rest`
fn tag_attributes(rest: &str) -> Vec<(&str, AttributeValue)> {
    let bytes = rest.as_bytes();
    let mut attributes = Vec::new();
    let mut i = 0;

    loop {
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        match bytes.get(i) {
            None | Some(b'>') => break,
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => break,
            Some(b'{') => match skip_braces(rest, i) {
                // spread props
                Some(end) => i = end,
                None => break,
            },
            Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {
                let name_start = i;
                while bytes
                    .get(i)
                    .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(*b, b'_' | b'-' | b':'))
                {
                    i += 1;
                }
                let name = &rest[name_start..i];

                while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
                    i += 1;
                }
                if bytes.get(i) != Some(&b'=') {
                    attributes.push((name, AttributeValue::Flag));
                    continue;
                }
                i += 1;
                while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
                    i += 1;
                }

                match bytes.get(i) {
                    Some(&quote @ (b'"' | b'\'')) => {
                        let Some(len) = rest[i + 1..].find(quote as char) else {
                            break;
                        };
                        let value = &rest[i + 1..i + 1 + len];
                        attributes.push((name, AttributeValue::Literal(value.to_string())));
                        i += len + 2;
                    }
                    Some(b'{') => {
                        let Some(end) = skip_braces(rest, i) else {
                            break;
                        };
                        attributes.push((name, expression_value(rest[i + 1..end - 1].trim())));
                        i = end;
                    }
                    _ => break,
                }
            }
            // not a tag after all (e.g. a comparison)
            Some(_) => break,
        }
    }

    attributes
}

/// Index just past the `}` matching the `{` at `open`
fn skip_braces(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'"' | b'\'' | b'`' => {
                i += 1 + s[i + 1..].find(b as char)?;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// `{'x'}`, `{"x"}` and `` {`x`} `` are literals; anything else is an expression
fn expression_value(inner: &str) -> AttributeValue {
    for quote in ['\'', '"', '`'] {
        let literal = inner
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
            .filter(|s| !s.contains(quote) && !s.contains('\\'))
            .filter(|s| quote != '`' || !s.contains("${"));
        if let Some(literal) = literal {
            return AttributeValue::Literal(literal.to_string());
        }
    }
    AttributeValue::Expression(inner.to_string())
}
