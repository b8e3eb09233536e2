/*!
# Disc Dump: Extents
*/

use serde::{
	Deserialize,
	Serialize,
};
use std::collections::BTreeMap;



#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
/// # Extents.
///
/// A set of LBAs stored as disjoint, inclusive `start => end` ranges.
/// Adjacent and overlapping ranges are merged on insert.
pub struct Extents(BTreeMap<i32, i32>);

impl Extents {
	#[must_use]
	/// # New.
	pub const fn new() -> Self { Self(BTreeMap::new()) }

	/// # Insert Range.
	///
	/// Add `start..=end`. Empty (backwards) ranges are ignored.
	pub fn insert(&mut self, start: i32, end: i32) {
		if end < start { return; }
		let mut start = start;
		let mut end = end;

		// Absorb a range that ends at or just before our start.
		if let Some((&s, &e)) = self.0.range(..=start).next_back() {
			if e.saturating_add(1) >= start {
				start = s;
				end = end.max(e);
			}
		}

		// Absorb everything that starts inside or just after us.
		let absorbed: Vec<(i32, i32)> = self.0.range(start..=end.saturating_add(1))
			.map(|(&s, &e)| (s, e))
			.collect();
		for (s, e) in absorbed {
			self.0.remove(&s);
			end = end.max(e);
		}

		self.0.insert(start, end);
	}

	/// # Remove One.
	///
	/// Split the containing range if needed.
	pub fn remove_one(&mut self, lba: i32) {
		let Some((&s, &e)) = self.0.range(..=lba).next_back() else { return; };
		if lba > e { return; }
		self.0.remove(&s);
		if s < lba { self.0.insert(s, lba - 1); }
		if lba < e { self.0.insert(lba + 1, e); }
	}

	#[must_use]
	/// # Contains?
	pub fn contains(&self, lba: i32) -> bool { self.end_of(lba).is_some() }

	#[must_use]
	/// # End Of Containing Range.
	pub fn end_of(&self, lba: i32) -> Option<i32> {
		self.0.range(..=lba)
			.next_back()
			.and_then(|(_, &e)| if lba <= e { Some(e) } else { None })
	}

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.0.is_empty() }

	#[must_use]
	/// # Total Sectors.
	pub fn sectors(&self) -> u64 {
		self.0.iter().map(|(&s, &e)| u64::from(e.abs_diff(s)) + 1).sum()
	}

	/// # Ranges.
	pub fn ranges(&self) -> impl Iterator<Item=(i32, i32)> + '_ {
		self.0.iter().map(|(&s, &e)| (s, e))
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_merge() {
		let mut ext = Extents::new();
		ext.insert(10, 19);
		ext.insert(30, 39);
		assert_eq!(ext.ranges().count(), 2);

		// Adjacent.
		ext.insert(20, 20);
		assert_eq!(ext.ranges().collect::<Vec<_>>(), [(10, 20), (30, 39)]);

		// Bridge.
		ext.insert(15, 32);
		assert_eq!(ext.ranges().collect::<Vec<_>>(), [(10, 39)]);
		assert_eq!(ext.sectors(), 30);

		// Backwards is ignored.
		ext.insert(100, 50);
		assert_eq!(ext.ranges().count(), 1);

		// Negatives work too.
		ext.insert(-150, 9);
		assert_eq!(ext.ranges().collect::<Vec<_>>(), [(-150, 39)]);
	}

	#[test]
	fn t_remove() {
		let mut ext = Extents::new();
		ext.insert(0, 9);
		ext.remove_one(5);
		assert_eq!(ext.ranges().collect::<Vec<_>>(), [(0, 4), (6, 9)]);
		ext.remove_one(0);
		ext.remove_one(9);
		assert_eq!(ext.ranges().collect::<Vec<_>>(), [(1, 4), (6, 8)]);
		ext.remove_one(100);
		assert_eq!(ext.sectors(), 7);

		assert!(ext.contains(7));
		assert!(! ext.contains(5));
		assert_eq!(ext.end_of(2), Some(4));
		assert_eq!(ext.end_of(5), None);
	}
}
