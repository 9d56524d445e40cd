/// A term-side value, either already resolved to a backing-store id or still
/// a surface-syntax literal awaiting resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A backing-store integer: an id (rid/bid/aid) or a raw `aNNN` literal.
    Id(i64),
    /// A numeric literal bound for the `amt` column.
    Amt(f64),
    /// A symbol: a key string pending `identify`, or a quoted string bound
    /// for the `alp` column.
    Str(String),
}

impl Operand {
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Operand::Id(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_amt(&self) -> Option<f64> {
        match self {
            Operand::Amt(v) => Some(*v),
            _ => None,
        }
    }
}
