/*!
# Disc Dump: Bad Block Iterator
*/

use std::{
	collections::BTreeSet,
	iter::Rev,
	vec::IntoIter,
};



#[derive(Debug, Clone)]
/// # Bad Block Iterator.
///
/// A snapshot of the bad block list, walked forward or backward. Retry passes
/// alternate direction, and this lets both share one type.
pub(super) enum BadIter {
	Forward(IntoIter<i32>),
	Backward(Rev<IntoIter<i32>>),
}

impl BadIter {
	/// # New Instance.
	pub(super) fn new(bad: &BTreeSet<i32>, backwards: bool) -> Self {
		let list: Vec<i32> = bad.iter().copied().collect();
		if backwards { Self::Backward(list.into_iter().rev()) }
		else { Self::Forward(list.into_iter()) }
	}
}

impl Iterator for BadIter {
	type Item = i32;
	fn next(&mut self) -> Option<Self::Item> {
		match self {
			Self::Forward(i) => i.next(),
			Self::Backward(i) => i.next(),
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let len = self.len();
		(len, Some(len))
	}
}

impl ExactSizeIterator for BadIter {
	fn len(&self) -> usize {
		match self {
			Self::Forward(i) => i.len(),
			Self::Backward(i) => i.len(),
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_bad_iter() {
		let set = BTreeSet::from([30, 5, 17, 100]);
		let a: Vec<i32> = BadIter::new(&set, false).collect();
		let mut b: Vec<i32> = BadIter::new(&set, true).collect();
		assert_eq!(a, [5, 17, 30, 100], "Forward should be ascending.");
		assert_ne!(a, b, "Sets should be in the opposite order!");
		b.reverse();
		assert_eq!(a, b, "Sets should match after reversing one of them!");
		assert_eq!(BadIter::new(&set, true).len(), 4);
	}
}
