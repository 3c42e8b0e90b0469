use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, Entry},
	HashMap,
};

/// Maps identities (node handles, watch keys) to values without touching the key objects themselves.
///
/// Inserting at an occupied key hands back the displaced value, so callers can dispose it before moving on.
#[derive(Debug, Clone)]
pub(crate) struct IdentityMap<K, V, S = DefaultHashBuilder>(HashMap<K, V, S>)
where
	K: Hash + Eq,
	S: BuildHasher;
impl<K, V, S> Default for IdentityMap<K, V, S>
where
	K: Hash + Eq,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, V, S> IdentityMap<K, V, S>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	/// Stores `v` at `k`, returning whatever was registered there before.
	pub fn replace(&mut self, k: K, v: V) -> Option<V> {
		match self.0.entry(k) {
			Entry::Occupied(mut occupied) => Some(occupied.insert(v)),
			Entry::Vacant(vacant) => {
				vacant.insert(v);
				None
			}
		}
	}

	pub fn get<Q: ?Sized>(&self, k: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.get(k)
	}

	pub fn get_mut<Q: ?Sized>(&mut self, k: &Q) -> Option<&mut V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.get_mut(k)
	}

	pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, k: K, v: F) -> &mut V {
		self.0.entry(k).or_insert_with(v)
	}

	pub fn remove<Q: ?Sized>(&mut self, k: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.remove(k)
	}

	/// Removes `k` only if `predicate` holds for its current value.
	pub fn remove_if<Q: ?Sized>(&mut self, k: &Q, predicate: impl FnOnce(&V) -> bool) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		if self.0.get(k).map_or(false, predicate) {
			self.0.remove(k)
		} else {
			None
		}
	}

	pub fn values(&self) -> impl Iterator<Item = &V> {
		self.0.values()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Empties the map, yielding every entry.
	pub fn dispose(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
		self.0.drain()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn replacing_returns_the_previous_registrant() {
		let mut map = IdentityMap::<u32, &str>::new();
		assert_eq!(map.replace(1, "a"), None);
		assert_eq!(map.replace(1, "b"), Some("a"));
		assert_eq!(map.get(&1), Some(&"b"));
	}

	#[test]
	fn conditional_removal() {
		let mut map = IdentityMap::<u32, &str>::new();
		map.replace(1, "a");
		assert_eq!(map.remove_if(&1, |v| *v == "b"), None);
		assert_eq!(map.remove_if(&1, |v| *v == "a"), Some("a"));
		assert_eq!(map.len(), 0);
	}
}
