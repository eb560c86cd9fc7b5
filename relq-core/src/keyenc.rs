//! Canonical cache-key encoding (component A): turns an `Expr`/`Type`
//! tree into a byte string plus a referenced-object list suitable for use
//! as a `WeakCache` key (`cache.rs`). Two equal trees must encode
//! identically; two unequal trees should (with overwhelming probability)
//! encode differently.
//!
//! Shaped after the teacher's `DynQuery` (`tank-core/src/query/
//! dyn_query.rs`): a growable output buffer behind a small typed write
//! surface. `DynQuery` separates a raw text buffer from a prepared
//! statement; this encoder separates the flat byte stream from the
//! out-of-line object table for the same reason — most of a key's
//! content is structural (cheap to compare inline), while strings and
//! shared subtrees are expensive to repeat, so they're deduplicated and
//! referenced by id instead.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::LazyLock;

use crate::config::Limits;
use crate::error::Result;

/// Tag written instead of a type tag when an entity (identity-keyed,
/// e.g. a shared `Rc<TupleType>`) has already been encoded once in this
/// key; followed by a varint id into the entity table.
pub const ENTITY_REF: u8 = 0;
/// Tag preceding a varint id into the object table (interned strings).
pub const OBJECT_REF: u8 = 1;

const FIRST_TAG: u8 = 2;
static NEXT_TAG: AtomicU8 = AtomicU8::new(FIRST_TAG);

/// Hands out the next type tag from the process-global monotone
/// counter. Each `Type`/`Expr` variant calls this exactly once, at the
/// `LazyLock` definitions below, so every variant gets a stable tag for
/// the life of the process regardless of call order.
fn alloc_type_tag() -> u8 {
    let prev = NEXT_TAG.fetch_add(1, Ordering::Relaxed);
    if prev.wrapping_add(1) == 0 {
        log::error!("KeyEncoder type-tag allocator exhausted (wrapped past u8::MAX)");
        panic!("KeyEncoder type-tag allocator exhausted");
    }
    prev
}

macro_rules! type_tags {
    ($($name:ident),+ $(,)?) => {
        $(pub static $name: LazyLock<u8> = LazyLock::new(alloc_type_tag);)+
    };
}

type_tags! {
    TAG_TYPE_NULL, TAG_TYPE_ANY, TAG_TYPE_BASIC, TAG_TYPE_TUPLE, TAG_TYPE_RELATION,
    TAG_EXPR_CONSTANT, TAG_EXPR_PARAM, TAG_EXPR_COLUMN, TAG_EXPR_ASSIGN, TAG_EXPR_VAR,
    TAG_EXPR_NOT, TAG_EXPR_NEG, TAG_EXPR_BINARY_OP, TAG_EXPR_IN, TAG_EXPR_RANGE,
    TAG_EXPR_CONVERSION, TAG_EXPR_PROJ,
}

/// The finished output of a `KeyEncoder`: a flat byte string plus the
/// table of strings it referenced. Both fields participate in equality
/// and hashing so two keys compare equal iff their source trees produced
/// byte-identical encodings *and* identical object tables.
#[derive(Debug, Clone)]
pub struct Key {
    pub bytes: Vec<u8>,
    pub objects: Vec<Rc<str>>,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes && self.objects == other.objects
    }
}
impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
        self.objects.hash(state);
    }
}

/// A single encoding pass. Not reusable across trees — build one, feed
/// it a tree via its `encode_key` method, then call `finish`.
pub struct KeyEncoder {
    bytes: Vec<u8>,
    entities: HashMap<usize, u32>,
    objects: Vec<Rc<str>>,
    object_ids: HashMap<Rc<str>, u32>,
    limits: Limits,
}

impl KeyEncoder {
    pub fn new(limits: Limits) -> Self {
        Self {
            bytes: Vec::new(),
            entities: HashMap::new(),
            objects: Vec::new(),
            object_ids: HashMap::new(),
            limits,
        }
    }

    /// Entity-table lookup for an identity-keyed node (e.g. a shared
    /// `Rc<TupleType>`): if `entity`'s address has been seen before,
    /// writes `ENTITY_REF` + its id and returns `Ok(false)` (caller must
    /// not re-encode the entity's fields); otherwise writes `tag`,
    /// registers the address, and returns `Ok(true)` (caller should now
    /// write the entity's fields).
    pub fn encode_entity<T>(&mut self, entity: &T, tag: u8) -> Result<bool> {
        let id = entity as *const T as usize;
        if let Some(&existing) = self.entities.get(&id) {
            self.write_u8(ENTITY_REF);
            self.write_varint(existing as u64);
            return Ok(false);
        }
        if self.entities.len() >= self.limits.max_entity_table_len {
            anyhow::bail!(
                "KeyEncoder entity table exceeded {} entries",
                self.limits.max_entity_table_len
            );
        }
        let next_id = self.entities.len() as u32;
        self.entities.insert(id, next_id);
        self.write_u8(tag);
        Ok(true)
    }

    /// Interns `s` into the object table (equal text always gets the
    /// same id) and writes `OBJECT_REF` + that id.
    pub fn write_object(&mut self, s: impl Into<Rc<str>>) {
        let s = s.into();
        let id = match self.object_ids.get(&s) {
            Some(&id) => id,
            None => {
                let id = self.objects.len() as u32;
                self.objects.push(Rc::clone(&s));
                self.object_ids.insert(s, id);
                id
            }
        };
        self.write_u8(OBJECT_REF);
        self.write_varint(id as u64);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.bytes.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.bytes.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    /// Unsigned LEB128 varint.
    pub fn write_varint(&mut self, mut v: u64) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.bytes.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    /// `None` encodes as `0`; `Some(n)` as `n + 1` — so a null array and
    /// a zero-length array are distinguishable on the wire.
    pub fn write_array_len(&mut self, len: Option<usize>) {
        match len {
            None => self.write_varint(0),
            Some(n) => self.write_varint(n as u64 + 1),
        }
    }

    pub fn finish(self) -> Key {
        Key {
            bytes: self.bytes,
            objects: self.objects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ColumnExpr, ConstantExpr};
    use crate::types::{BasicType, Column, Type, TypeClass, TupleType};
    use crate::Expr;
    use std::collections::BTreeMap;

    fn row(name: &str) -> Rc<TupleType> {
        Rc::new(TupleType::new(BTreeMap::from([(
            name.to_string(),
            Column::new(name, Type::Basic(BasicType::new(TypeClass::Int32))),
        )])))
    }

    #[test]
    fn equal_constants_encode_identically() {
        let a = Expr::Constant(ConstantExpr::int32(1));
        let b = Expr::Constant(ConstantExpr::int32(1));
        let ka = crate::expr::encode_expr_key(&a, &Limits::default()).unwrap();
        let kb = crate::expr::encode_expr_key(&b, &Limits::default()).unwrap();
        assert_eq!(ka, kb);
    }

    #[test]
    fn different_constants_encode_differently() {
        let a = Expr::Constant(ConstantExpr::int32(1));
        let b = Expr::Constant(ConstantExpr::int32(2));
        let ka = crate::expr::encode_expr_key(&a, &Limits::default()).unwrap();
        let kb = crate::expr::encode_expr_key(&b, &Limits::default()).unwrap();
        assert_ne!(ka, kb);
    }

    #[test]
    fn shared_row_type_encodes_once_via_entity_table() {
        let row = row("a");
        let col_a = Expr::Column(ColumnExpr::new(row.clone(), vec!["a".to_string()]).unwrap());
        let col_a_again = Expr::Column(ColumnExpr::new(row, vec!["a".to_string()]).unwrap());
        let mut enc = KeyEncoder::new(Limits::default());
        col_a.encode_key(&mut enc).unwrap();
        let before_second = enc.bytes.len();
        col_a_again.encode_key(&mut enc).unwrap();
        let second_len = enc.bytes.len() - before_second;
        // The second reference to the same `Rc<TupleType>` is just
        // ENTITY_REF + a one-byte varint id + the path, far shorter than
        // a fresh tuple-type encoding would be.
        assert!(second_len < before_second);
    }

    #[test]
    fn object_table_interns_equal_strings() {
        let mut enc = KeyEncoder::new(Limits::default());
        enc.write_object("hello");
        enc.write_object("hello");
        let key = enc.finish();
        assert_eq!(key.objects.len(), 1);
    }

    #[test]
    fn array_len_distinguishes_null_from_empty() {
        let mut enc = KeyEncoder::new(Limits::default());
        enc.write_array_len(None);
        enc.write_array_len(Some(0));
        let key = enc.finish();
        assert_eq!(key.bytes, vec![0, 1]);
    }
}
