//! Reserved numeric constants shared by the resolver, compilers and the
//! `memelang-db` schema installer.

/// Graph id used when a job's `g=` preamble key is absent.
pub const DEFAULT_GRAPH: i64 = 999;

/// Ids at or below this value are reserved; user-assigned ids never land here
/// and the sequence generator starts one above it.
pub const COR: i64 = 1 << 29;

/// Relation id of the reserved `key` binding: a `(gid, bid, rid=KEY, alp)` row
/// in the `name` table records the case-preserving source text a numeric id
/// was minted for.
pub const KEY_RELATION: i64 = 513;

/// Relation id reserved for a full-name annotation, carried over from the
/// original key space even though this engine does not interpret it.
pub const NAME_RELATION: i64 = 512;

/// Relation id reserved for a title annotation, same status as
/// [`NAME_RELATION`].
pub const TITLE_RELATION: i64 = 514;

pub const TABLE_NODE: &str = "node";
pub const TABLE_NUMB: &str = "numb";
pub const TABLE_NAME: &str = "name";

/// Magic relation name recognized only as the first term of an `Expression`,
/// naming the body id an insert should reuse instead of minting a fresh one.
pub const BID_KEYWORD: &str = "bid";
