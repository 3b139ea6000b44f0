//! Builder for the send-only data frame shape (spec §3.4): an
//! attribute-bearing `Vector` of columns, with `names`/`row.names`/`class`
//! attributes in a fixed order.
//!
//! Grounded on the teacher's `ExportList::put` (`proto.rs`): a builder type
//! that assembles several wire records into one reply, generalised here to
//! build a `Sexp` value instead of writing directly to a stream.

use log::debug;

use crate::sexp::{Na, Sexp};

/// One named column of a data frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The column's name, placed in the `names` attribute.
    pub name: String,
    /// The column's values, already in their final sendable `Sexp` shape
    /// (`Str`, `ArrayStr`, `ArrayInt`, `ArrayDouble`, or `ArrayBool` — see
    /// [`crate::encode::promote_ints`] for building an `ArrayInt` column from
    /// wider integers).
    pub values: Sexp,
}

impl Column {
    /// Construct a column.
    pub fn new(name: impl Into<String>, values: Sexp) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    fn len(&self) -> Option<usize> {
        match &self.values {
            Sexp::ArrayStr(v) => Some(v.len()),
            Sexp::ArrayInt(v) => Some(v.len()),
            Sexp::ArrayDouble(v) => Some(v.len()),
            Sexp::ArrayBool(v) => Some(v.len()),
            Sexp::Str(_) => Some(1),
            _ => None,
        }
    }
}

/// A finite ordered sequence of named columns, ready to serialise per spec
/// §3.4/§4.3: `HasAttr(ListTag[names, row.names, class], Vector(values))`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    columns: Vec<Column>,
}

impl DataFrame {
    /// Build a data frame from its columns. Column length equality is an
    /// invariant the wire format assumes but does not itself carry (spec
    /// §3.4/§9: "unchecked"); this constructor logs a mismatch rather than
    /// rejecting it, leaving the choice the spec's Open Questions pose
    /// unresolved rather than unilaterally picking "validate".
    pub fn new(columns: Vec<Column>) -> Self {
        if let Some(expected) = columns.first().and_then(Column::len) {
            for col in &columns[1..] {
                if let Some(len) = col.len() {
                    if len != expected {
                        debug!(
                            "data frame column {:?} has length {len}, expected {expected} (unchecked per spec)",
                            col.name
                        );
                    }
                }
            }
        }
        Self { columns }
    }

    /// Number of rows, taken from the first column's length (0 if there are
    /// no columns or the first column's length can't be determined).
    pub fn row_count(&self) -> usize {
        self.columns.first().and_then(Column::len).unwrap_or(0)
    }

    /// Serialise into the `HasAttr(ListTag, Vector(..))` shape spec §3.4
    /// defines: `names`, `row.names`, `class` attributes in that order.
    pub fn into_sexp(self) -> Sexp {
        let n = self.row_count();
        let names = Sexp::ArrayStr(self.columns.iter().map(|c| Na::Some(c.name.clone())).collect());
        let row_names = Sexp::ArrayInt((1..=n as i32).map(Na::Some).collect());
        let class = Sexp::ArrayStr(vec![Na::Some("data.frame".to_string())]);

        let attrs = Sexp::ListTag(vec![
            (Sexp::SymName("names".to_string()), names),
            (Sexp::SymName("row.names".to_string()), row_names),
            (Sexp::SymName("class".to_string()), class),
        ]);
        let values = Sexp::Vector(self.columns.into_iter().map(|c| c.values).collect());
        Sexp::HasAttr(Box::new(attrs), Box::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_attribute_shape() {
        let df = DataFrame::new(vec![
            Column::new("Letters", Sexp::ArrayStr(vec![Na::Some("a".into()), Na::Some("b".into())])),
            Column::new("Numbers", Sexp::ArrayInt(vec![Na::Some(1), Na::Some(3)])),
        ]);
        let sexp = df.into_sexp();
        match sexp {
            Sexp::HasAttr(attr, inner) => {
                let pairs = match *attr {
                    Sexp::ListTag(pairs) => pairs,
                    other => panic!("expected ListTag attrs, got {other:?}"),
                };
                assert_eq!(pairs.len(), 3);
                assert_eq!(pairs[0].0, Sexp::SymName("names".to_string()));
                assert_eq!(
                    pairs[0].1,
                    Sexp::ArrayStr(vec![Na::Some("Letters".to_string()), Na::Some("Numbers".to_string())])
                );
                assert_eq!(pairs[1].0, Sexp::SymName("row.names".to_string()));
                assert_eq!(pairs[1].1, Sexp::ArrayInt(vec![Na::Some(1), Na::Some(2)]));
                assert_eq!(pairs[2].0, Sexp::SymName("class".to_string()));
                assert_eq!(
                    pairs[2].1,
                    Sexp::ArrayStr(vec![Na::Some("data.frame".to_string())])
                );
                match *inner {
                    Sexp::Vector(cols) => assert_eq!(cols.len(), 2),
                    other => panic!("expected Vector, got {other:?}"),
                }
            }
            other => panic!("expected HasAttr, got {other:?}"),
        }
    }

    #[test]
    fn empty_data_frame_has_zero_rows() {
        let df = DataFrame::new(vec![]);
        assert_eq!(df.row_count(), 0);
    }
}
