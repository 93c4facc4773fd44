use std::fmt;

use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::error::{ChordError, Result};

/// Ring width used when nothing else is configured: a 256 slot ring.
pub const DEFAULT_BITS: u32 = 8;
/// Widest ring a SHA-256 digest can fill.
pub const MAX_BITS: u32 = 256;

/// A point on the chord ring. Values are always reduced into the
/// [`IdSpace`] that produced them, so two ids from the same space can be
/// compared directly.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug)]
pub struct CircularId{
	id: BigUint,
}

impl CircularId{
	pub fn as_biguint(&self) -> &BigUint {
		&self.id
	}
}

impl fmt::Display for CircularId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.id)
	}
}

/// The circular identifier space of size 2^bits.
///
/// All ordering decisions made by the protocol reduce to comparing
/// [`IdSpace::forward_distance`] or [`IdSpace::backward_distance`]; the arc
/// predicates below are built from those two primitives only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdSpace{
	bits: u32,
	modulus: BigUint,
}

impl IdSpace{
	pub fn new(bits: u32) -> Result<IdSpace>{
		if bits == 0 || bits > MAX_BITS {
			return Err(ChordError::Config(format!("ring width must be within 1..={MAX_BITS} bits, got {bits}")));
		}
		Ok(IdSpace{
			bits,
			modulus: BigUint::from(1u32) << bits,
		})
	}

	pub fn bits(&self) -> u32 {
		self.bits
	}

	pub fn modulus(&self) -> &BigUint {
		&self.modulus
	}

	fn reduce(&self, id: BigUint) -> CircularId{
		CircularId{ id: id % &self.modulus }
	}

	pub fn id_from(&self, value: u64) -> CircularId{
		self.reduce(BigUint::from(value))
	}

	/// Parse a decimal id, reducing it into the ring.
	pub fn parse(&self, data: &str) -> Option<CircularId>{
		BigUint::parse_bytes(data.trim().as_bytes(), 10).map(|id| self.reduce(id))
	}

	/// Map an arbitrary string onto the ring.
	///
	/// Rings of up to 31 bits read the first four digest bytes as a signed
	/// big-endian integer and reduce its absolute value. Wider rings use the
	/// whole digest.
	pub fn hash(&self, data: &str) -> CircularId{
		let digest = Sha256::digest(data.as_bytes());
		if self.bits <= 31 {
			let head = i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
			self.reduce(BigUint::from(head.unsigned_abs()))
		}else{
			self.reduce(BigUint::from_bytes_be(&digest))
		}
	}

	/// Steps walking clockwise from `from` to `to`.
	pub fn forward_distance(&self, from: &CircularId, to: &CircularId) -> BigUint{
		(&self.modulus + &to.id - &from.id) % &self.modulus
	}

	/// Steps walking counter-clockwise from `from` to `to`.
	pub fn backward_distance(&self, from: &CircularId, to: &CircularId) -> BigUint{
		(&self.modulus + &from.id - &to.id) % &self.modulus
	}

	/// Start of finger `index` for a node at `owner`: owner + 2^index.
	pub fn finger_start(&self, owner: &CircularId, index: u32) -> CircularId{
		self.reduce(&owner.id + (BigUint::from(1u32) << index))
	}

	/// Tests if `id` is in the open arc (lower, upper).
	/// When lower == upper the arc is the whole ring except lower.
	pub fn in_open_arc(&self, id: &CircularId, lower: &CircularId, upper: &CircularId) -> bool{
		if id == lower {
			return false;
		}
		if lower == upper {
			return true;
		}
		self.forward_distance(lower, id) < self.forward_distance(lower, upper)
	}

	/// Tests if `id` is in the arc (lower, upper].
	/// When lower == upper the arc is the whole ring.
	pub fn in_half_open_arc(&self, id: &CircularId, lower: &CircularId, upper: &CircularId) -> bool{
		if lower == upper {
			return true;
		}
		if id == lower {
			return false;
		}
		self.forward_distance(lower, id) <= self.forward_distance(lower, upper)
	}
}

impl Default for IdSpace{
	fn default() -> Self {
		IdSpace{
			bits: DEFAULT_BITS,
			modulus: BigUint::from(1u32) << DEFAULT_BITS,
		}
	}
}


#[cfg(test)]
mod tests{
	use super::*;

	#[test]
	fn hash_is_deterministic_and_in_range(){
		let space = IdSpace::default();
		for s in ["", "alpha", "127.0.0.1|5000", "a much longer key with spaces"] {
			let a = space.hash(s);
			let b = space.hash(s);
			assert_eq!(a, b);
			assert!(a.as_biguint() < space.modulus());
		}

		let wide = IdSpace::new(160).unwrap();
		let id = wide.hash("alpha");
		assert!(id.as_biguint() < wide.modulus());
	}

	#[test]
	fn narrow_hash_uses_leading_digest_bytes(){
		let space = IdSpace::default();
		let digest = Sha256::digest(b"alpha");
		let head = i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
		let expected = u64::from(head.unsigned_abs()) % 256;
		assert_eq!(space.hash("alpha"), space.id_from(expected));
	}

	#[test]
	fn distances_are_complementary(){
		let space = IdSpace::default();
		for (a, b) in [(0u64, 0u64), (3, 200), (200, 3), (255, 0), (17, 17)] {
			let a = space.id_from(a);
			let b = space.id_from(b);
			let sum = (space.forward_distance(&a, &b) + space.backward_distance(&a, &b)) % space.modulus();
			assert_eq!(sum, BigUint::from(0u32));
			assert_eq!(space.forward_distance(&a, &b), space.backward_distance(&b, &a));
		}
		let a = space.id_from(42);
		assert_eq!(space.forward_distance(&a, &a), BigUint::from(0u32));
		assert_eq!(space.forward_distance(&space.id_from(250), &space.id_from(4)), BigUint::from(10u32));
		assert_eq!(space.backward_distance(&space.id_from(4), &space.id_from(250)), BigUint::from(10u32));
	}

	#[test]
	fn finger_start_wraps(){
		let space = IdSpace::default();
		let owner = space.id_from(250);
		assert_eq!(space.finger_start(&owner, 0), space.id_from(251));
		assert_eq!(space.finger_start(&owner, 3), space.id_from(2));
		assert_eq!(space.finger_start(&owner, 7), space.id_from(122));
	}

	#[test]
	fn arcs_wrap_around_zero(){
		let space = IdSpace::default();
		let id = |v| space.id_from(v);
		assert!(space.in_open_arc(&id(2), &id(250), &id(10)));
		assert!(!space.in_open_arc(&id(10), &id(250), &id(10)));
		assert!(space.in_half_open_arc(&id(10), &id(250), &id(10)));
		assert!(!space.in_half_open_arc(&id(250), &id(250), &id(10)));
		assert!(!space.in_open_arc(&id(100), &id(250), &id(10)));

		// a degenerate arc covers the ring
		assert!(space.in_open_arc(&id(7), &id(5), &id(5)));
		assert!(!space.in_open_arc(&id(5), &id(5), &id(5)));
		assert!(space.in_half_open_arc(&id(5), &id(5), &id(5)));
	}

	#[test]
	fn parse_reduces_into_ring(){
		let space = IdSpace::default();
		assert_eq!(space.parse("300"), Some(space.id_from(44)));
		assert_eq!(space.parse(" 7 "), Some(space.id_from(7)));
		assert_eq!(space.parse("seven"), None);
	}

	#[test]
	fn rejects_invalid_widths(){
		assert!(IdSpace::new(0).is_err());
		assert!(IdSpace::new(257).is_err());
		assert!(IdSpace::new(128).is_ok());
	}
}
