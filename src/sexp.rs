//! The typed in-memory representation of an R value carried over the wire.

/// A value that is either present or the distinguished R "not available"
/// marker. NA is first-class and distinct from any present value, including
/// the zero/empty value of its type.
#[derive(Debug, Clone, PartialEq)]
pub enum Na<T> {
    /// A present value.
    Some(T),
    /// The R `NA` marker.
    NA,
}

impl<T> Na<T> {
    /// True if this is the NA marker.
    pub fn is_na(&self) -> bool {
        matches!(self, Na::NA)
    }

    /// The present value, if any.
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Na::Some(v) => Some(v),
            Na::NA => None,
        }
    }

    /// Apply `f` to a present value, passing `NA` through unchanged.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Na<U> {
        match self {
            Na::Some(v) => Na::Some(f(v)),
            Na::NA => Na::NA,
        }
    }
}

/// A double that may be a present finite value, NA, or one of the two
/// infinities. (A present NaN is also representable; it round-trips as NaN,
/// distinct from NA.)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RDouble {
    /// An ordinary finite or NaN value.
    Value(f64),
    /// The R `NA` marker.
    NA,
    /// Positive infinity.
    PosInf,
    /// Negative infinity.
    NegInf,
}

/// A tagged R value, as decoded from or destined for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    /// `XT_NULL`.
    Null,
    /// A single string (UTF-8 bytes, no terminator in memory).
    Str(String),
    /// An ordered sequence of strings, each possibly NA.
    ArrayStr(Vec<Na<String>>),
    /// An ordered sequence of 32-bit integers, each possibly NA.
    ArrayInt(Vec<Na<i32>>),
    /// An ordered sequence of doubles, each possibly NA/Inf/NaN.
    ArrayDouble(Vec<RDouble>),
    /// An ordered sequence of booleans, each possibly NA.
    ArrayBool(Vec<Na<bool>>),
    /// An ordered, heterogeneous sequence of SEXPs.
    Vector(Vec<Sexp>),
    /// An ordered sequence of `(key, value)` pairs. Key and value are
    /// themselves arbitrary SEXPs (the key is typically a `SymName`).
    ListTag(Vec<(Sexp, Sexp)>),
    /// A symbol name.
    SymName(String),
    /// An opaque R closure, passed through uninterpreted.
    Closure(Vec<u8>),
    /// A type byte this codec does not interpret, with its raw payload.
    Unimplemented(u8, Vec<u8>),
    /// A value with an attached attribute SEXP (commonly a tagged list of
    /// `names`/`row.names`/`class`, giving the inner value structure such as
    /// "data frame").
    HasAttr(Box<Sexp>, Box<Sexp>),
}

/// The wire type a sendable SEXP will be serialised as — the `type` argument
/// spec §4.3/§6.2 gives `SetVariable(name, type, value)`. A caller states the
/// tag it intends to send; [`SexpTag::matches`] checks it against the actual
/// shape of the value so a mismatched pair is a typed error instead of
/// silently sending whatever the value's own variant happens to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SexpTag {
    /// `Sexp::Str`.
    Str,
    /// `Sexp::ArrayStr`.
    ArrayStr,
    /// `Sexp::ArrayInt`.
    ArrayInt,
    /// `Sexp::ArrayDouble`.
    ArrayDouble,
    /// `Sexp::ArrayBool`.
    ArrayBool,
    /// `Sexp::Vector`, including a `HasAttr`-wrapped one (e.g. a data frame's
    /// `HasAttr(ListTag, Vector)` shape — the attribute is a modifier, not a
    /// distinct payload type on the wire, so it's stripped before matching).
    Vector,
    /// `Sexp::ListTag`.
    ListTag,
}

impl SexpTag {
    /// Whether `value` (with any `HasAttr` wrapper stripped) has the shape
    /// this tag names.
    pub fn matches(&self, value: &Sexp) -> bool {
        let (inner, _) = value.strip_attr();
        matches!(
            (self, inner),
            (SexpTag::Str, Sexp::Str(_))
                | (SexpTag::ArrayStr, Sexp::ArrayStr(_))
                | (SexpTag::ArrayInt, Sexp::ArrayInt(_))
                | (SexpTag::ArrayDouble, Sexp::ArrayDouble(_))
                | (SexpTag::ArrayBool, Sexp::ArrayBool(_))
                | (SexpTag::Vector, Sexp::Vector(_))
                | (SexpTag::ListTag, Sexp::ListTag(_))
        )
    }
}

impl Sexp {
    /// Strip a `HasAttr` wrapper, returning the inner value and its
    /// attributes if present.
    pub fn strip_attr(&self) -> (&Sexp, Option<&Sexp>) {
        match self {
            Sexp::HasAttr(attr, inner) => (inner, Some(attr)),
            other => (other, None),
        }
    }

    /// A short name for the value's own variant, with any `HasAttr` wrapper
    /// stripped. Used only to describe a value in a [`crate::Error::TypeMismatch`].
    pub fn shape_name(&self) -> &'static str {
        match self.strip_attr().0 {
            Sexp::Null => "Null",
            Sexp::Str(_) => "Str",
            Sexp::ArrayStr(_) => "ArrayStr",
            Sexp::ArrayInt(_) => "ArrayInt",
            Sexp::ArrayDouble(_) => "ArrayDouble",
            Sexp::ArrayBool(_) => "ArrayBool",
            Sexp::Vector(_) => "Vector",
            Sexp::ListTag(_) => "ListTag",
            Sexp::SymName(_) => "SymName",
            Sexp::Closure(_) => "Closure",
            Sexp::Unimplemented(..) => "Unimplemented",
            Sexp::HasAttr(..) => unreachable!("strip_attr never returns a HasAttr"),
        }
    }
}
