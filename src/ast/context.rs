//! Evaluation context and path resolution
//!
//! A [`Context`] is a resolution scope over one document. Paths use `.` to
//! descend into objects and `[n]` to index arrays:
//!
//! ```text
//! address.city
//! contacts[0].name
//! matrix[1][2]
//! ```
//!
//! A key that is absent from an object resolves to `null`. Descending
//! through anything that is not an object or array is an error that names
//! the offending sub-path and the kind actually found.

use std::fmt;

use thiserror::Error;

use crate::value::{Value, ValueKind, NULL};

/// Path resolution failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Tried to read a named property from a non-object
    #[error("cannot read property '{property}' at '{path}': found {found}, expected object")]
    NotAnObject {
        property: String,
        path: String,
        found: ValueKind,
    },

    /// Tried to index into a non-array
    #[error("cannot index [{index}] at '{path}': found {found}, expected array")]
    NotAnArray {
        index: usize,
        path: String,
        found: ValueKind,
    },

    /// Index is outside the array
    #[error("index [{index}] at '{path}' is out of bounds for length {len}")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        path: String,
    },

    /// Bracket content is not a non-negative integer
    #[error("invalid array index '{element}'")]
    InvalidIndex { element: String },

    /// Path syntax is broken
    #[error("malformed path '{path}'")]
    Malformed { path: String },
}

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Key(k) => write!(f, "{}", k),
            PathElement::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Splits a path into its elements
pub fn parse_path(path: &str) -> Result<Vec<PathElement>, PathError> {
    let malformed = || PathError::Malformed {
        path: path.to_string(),
    };

    let mut elements = Vec::new();
    let mut key = String::new();
    // true right after a '.', where a key is mandatory
    let mut expect_key = false;
    let mut chars = path.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '.' => {
                if key.is_empty() && (expect_key || elements.is_empty()) {
                    return Err(malformed());
                }
                if !key.is_empty() {
                    elements.push(PathElement::Key(std::mem::take(&mut key)));
                }
                expect_key = true;
            }
            '[' => {
                if expect_key && key.is_empty() {
                    return Err(malformed());
                }
                if !key.is_empty() {
                    elements.push(PathElement::Key(std::mem::take(&mut key)));
                }
                let rest = &path[pos + 1..];
                let close = rest.find(']').ok_or_else(malformed)?;
                let element = &rest[..close];
                let index = element
                    .parse::<usize>()
                    .map_err(|_| PathError::InvalidIndex {
                        element: element.to_string(),
                    })?;
                elements.push(PathElement::Index(index));
                // skip past the index and its closing bracket
                for _ in 0..=element.chars().count() {
                    chars.next();
                }
                if let Some(&(_, next)) = chars.peek() {
                    if next != '.' && next != '[' {
                        return Err(malformed());
                    }
                }
                expect_key = false;
            }
            ']' => return Err(malformed()),
            c => {
                key.push(c);
                expect_key = false;
            }
        }
    }

    if expect_key {
        return Err(malformed());
    }
    if !key.is_empty() {
        elements.push(PathElement::Key(key));
    }
    Ok(elements)
}

/// Appends `suffix` to a path prefix, inserting a separator when needed
fn join_path(prefix: &str, suffix: &str) -> String {
    if prefix.is_empty() {
        suffix.to_string()
    } else if suffix.is_empty() {
        prefix.to_string()
    } else if suffix.starts_with('[') {
        format!("{}{}", prefix, suffix)
    } else {
        format!("{}.{}", prefix, suffix)
    }
}

/// Resolution scope over a single document
#[derive(Debug, Clone)]
pub struct Context<'a> {
    document: &'a Value,
    prefix: String,
}

impl<'a> Context<'a> {
    /// Creates a context rooted at the document
    pub fn new(document: &'a Value) -> Self {
        Self {
            document,
            prefix: String::new(),
        }
    }

    pub fn document(&self) -> &'a Value {
        self.document
    }

    /// Accumulated path prefix of a relative context
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns a context whose lookups are relative to `path`
    pub fn sub_context(&self, path: &str) -> Context<'a> {
        Context {
            document: self.document,
            prefix: join_path(&self.prefix, path),
        }
    }

    /// Resolves a path and returns a copy of the value found
    pub fn get_path(&self, path: &str) -> Result<Value, PathError> {
        self.resolve(path).cloned()
    }

    /// Resolves a path relative to this context's prefix
    pub fn resolve(&self, path: &str) -> Result<&'a Value, PathError> {
        let full = join_path(&self.prefix, path);
        let elements = parse_path(&full)?;

        let mut current = self.document;
        let mut walked = String::new();

        for element in &elements {
            match element {
                PathElement::Key(key) => {
                    current = match current {
                        Value::Object(map) => map.get(key).unwrap_or(&NULL),
                        other => {
                            return Err(PathError::NotAnObject {
                                property: key.clone(),
                                path: walked,
                                found: other.kind(),
                            })
                        }
                    };
                }
                PathElement::Index(index) => {
                    current = match current {
                        Value::Array(items) => {
                            items.get(*index).ok_or_else(|| PathError::IndexOutOfBounds {
                                index: *index,
                                len: items.len(),
                                path: walked.clone(),
                            })?
                        }
                        other => {
                            return Err(PathError::NotAnArray {
                                index: *index,
                                path: walked,
                                found: other.kind(),
                            })
                        }
                    };
                }
            }
            walked = join_path(&walked, &element.to_string());
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, Literal};
    use serde_json::json;

    fn doc() -> Value {
        Value::from(json!({
            "name": "will",
            "age": 39,
            "address": {"street": "1 Main", "state": "CA"},
            "children": [
                {"name": "bob", "age": 5},
                {"name": "jill", "age": 3}
            ],
            "matrix": [[1, 2], [3, 4]]
        }))
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("contacts[0].name").unwrap(),
            vec![
                PathElement::Key("contacts".into()),
                PathElement::Index(0),
                PathElement::Key("name".into()),
            ]
        );
        assert_eq!(
            parse_path("[5].state").unwrap(),
            vec![PathElement::Index(5), PathElement::Key("state".into())]
        );
        assert_eq!(
            parse_path("m[1][2]").unwrap(),
            vec![
                PathElement::Key("m".into()),
                PathElement::Index(1),
                PathElement::Index(2),
            ]
        );
        assert!(parse_path("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_path_errors() {
        assert!(matches!(parse_path("a]"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a..b"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path(".a"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a."), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a[0"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a[0]b"), Err(PathError::Malformed { .. })));
        assert!(matches!(
            parse_path("a[x]"),
            Err(PathError::InvalidIndex { .. })
        ));
        assert!(matches!(
            parse_path("a[-1]"),
            Err(PathError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_get_path() {
        let d = doc();
        let ctx = Context::new(&d);

        assert_eq!(ctx.get_path("name").unwrap(), Value::from("will"));
        assert_eq!(ctx.get_path("address.state").unwrap(), Value::from("CA"));
        assert_eq!(ctx.get_path("children[1].name").unwrap(), Value::from("jill"));
        assert_eq!(ctx.get_path("matrix[1][0]").unwrap(), Value::Number(3.0));
        assert_eq!(ctx.get_path("").unwrap(), d);
    }

    /// Collects `(path, literal)` for every key and index below `literal`
    fn literal_paths(prefix: &str, literal: &Expression, out: &mut Vec<(String, Expression)>) {
        match literal {
            Expression::Literal(Literal::Object(entries)) => {
                for (key, item) in entries {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    out.push((path.clone(), item.clone()));
                    literal_paths(&path, item, out);
                }
            }
            Expression::Literal(Literal::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let path = format!("{}[{}]", prefix, i);
                    out.push((path.clone(), item.clone()));
                    literal_paths(&path, item, out);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_literal_document_paths_resolve() {
        let literal = Expression::object(vec![
            ("title", Expression::string("tour")),
            ("empty", Expression::null()),
            (
                "stops",
                Expression::array(vec![
                    Expression::object(vec![
                        ("city", Expression::string("Oslo")),
                        ("days", Expression::number(2.0)),
                    ]),
                    Expression::object(vec![
                        ("city", Expression::string("Bergen")),
                        ("open", Expression::boolean(true)),
                    ]),
                ]),
            ),
            (
                "grid",
                Expression::array(vec![
                    Expression::array(vec![Expression::number(1.0), Expression::number(2.5)]),
                    Expression::array(vec![Expression::boolean(false)]),
                ]),
            ),
            (
                "meta",
                Expression::object(vec![(
                    "owner",
                    Expression::object(vec![("name", Expression::string("kim"))]),
                )]),
            ),
        ]);

        let nothing = Value::Null;
        let scratch = Context::new(&nothing);
        let document = literal.evaluate(&scratch).unwrap();
        let ctx = Context::new(&document);

        let mut paths = Vec::new();
        literal_paths("", &literal, &mut paths);
        assert_eq!(paths.len(), 18);

        for (path, item) in &paths {
            assert_eq!(
                ctx.get_path(path).unwrap(),
                item.evaluate(&scratch).unwrap(),
                "path {}",
                path
            );
        }
        assert_eq!(ctx.get_path("").unwrap(), document);
    }

    #[test]
    fn test_missing_final_key_is_null() {
        let d = doc();
        let ctx = Context::new(&d);
        assert_eq!(ctx.get_path("address.dne").unwrap(), Value::Null);
    }

    #[test]
    fn test_resolution_errors() {
        let d = doc();
        let ctx = Context::new(&d);

        let err = ctx.get_path("address.dne.dne").unwrap_err();
        assert_eq!(
            err,
            PathError::NotAnObject {
                property: "dne".into(),
                path: "address.dne".into(),
                found: ValueKind::Null,
            }
        );

        assert!(matches!(
            ctx.get_path("children[1].name.xyz"),
            Err(PathError::NotAnObject { found: ValueKind::String, .. })
        ));
        assert!(matches!(
            ctx.get_path("address[0]"),
            Err(PathError::NotAnArray { found: ValueKind::Object, .. })
        ));
        assert!(matches!(
            ctx.get_path("children[7]"),
            Err(PathError::IndexOutOfBounds { index: 7, len: 2, .. })
        ));
    }

    #[test]
    fn test_error_names_sub_path() {
        let d = doc();
        let ctx = Context::new(&d);
        let message = ctx.get_path("children[0].age.years").unwrap_err().to_string();
        assert!(message.contains("children[0].age"));
        assert!(message.contains("number"));
    }

    #[test]
    fn test_sub_context() {
        let d = doc();
        let ctx = Context::new(&d);

        let address = ctx.sub_context("address");
        assert_eq!(address.prefix(), "address");
        assert_eq!(address.get_path("street").unwrap(), Value::from("1 Main"));

        let children = ctx.sub_context("children");
        assert_eq!(children.get_path("[0].name").unwrap(), Value::from("bob"));

        let nested = children.sub_context("[1]");
        assert_eq!(nested.prefix(), "children[1]");
        assert_eq!(nested.get_path("age").unwrap(), Value::Number(3.0));
    }
}
