/*!
# Disc Dump: Progress
*/

use fyi_msg::{
	Msg,
	Progless,
};
use std::time::Duration;



/// # Progress Sink.
///
/// Fire-and-forget notifications from the dumper. Every method defaults to a
/// no-op, so implementers only override what they care about.
pub trait ProgressSink {
	/// # Start Determinate Progress.
	fn on_init(&mut self) {}

	/// # Update Determinate Progress.
	fn on_update(&mut self, _text: &str, _current: u64, _max: u64) {}

	/// # Indeterminate Progress.
	fn on_pulse(&mut self, _text: &str) {}

	/// # End Progress.
	fn on_end(&mut self) {}

	/// # Status Line.
	fn on_status(&mut self, _text: &str) {}

	/// # Stopping Error.
	fn on_error(&mut self, _text: &str) {}

	/// # Sector Timing.
	///
	/// How long the drive took to return `count` sectors at `lba`.
	fn on_sector_timing(&mut self, _lba: i32, _count: u32, _elapsed: Duration) {}

	/// # Unreadable Sector.
	fn on_unreadable(&mut self, _lba: i32) {}
}



#[derive(Debug, Clone, Copy, Default)]
/// # No Progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {}

impl<P: ProgressSink + ?Sized> ProgressSink for &mut P {
	fn on_init(&mut self) { (**self).on_init(); }
	fn on_update(&mut self, text: &str, current: u64, max: u64) { (**self).on_update(text, current, max); }
	fn on_pulse(&mut self, text: &str) { (**self).on_pulse(text); }
	fn on_end(&mut self) { (**self).on_end(); }
	fn on_status(&mut self, text: &str) { (**self).on_status(text); }
	fn on_error(&mut self, text: &str) { (**self).on_error(text); }
	fn on_sector_timing(&mut self, lba: i32, count: u32, elapsed: Duration) {
		(**self).on_sector_timing(lba, count, elapsed);
	}
	fn on_unreadable(&mut self, lba: i32) { (**self).on_unreadable(lba); }
}



#[derive(Debug, Default)]
/// # Progless Sink.
///
/// Renders progress with a `Progless` bar and prints status lines as they
/// come in.
pub struct ProglessSink {
	bar: Progless,
	last: u64,
}

impl ProglessSink {
	#[must_use]
	/// # New.
	pub fn new() -> Self { Self::default() }
}

impl ProgressSink for ProglessSink {
	fn on_update(&mut self, text: &str, current: u64, max: u64) {
		// Reset whenever the total changes or we go backwards.
		if current < self.last || current == 0 {
			let _res = self.bar.reset(u32::try_from(max).unwrap_or(u32::MAX));
		}
		if current > self.last {
			let step = u32::try_from(current - self.last).unwrap_or(u32::MAX);
			self.bar.increment_n(step);
		}
		self.last = current;
		self.bar.set_title(Some(Msg::custom("Dumping", 199, text)));
	}

	fn on_pulse(&mut self, text: &str) {
		self.bar.set_title(Some(Msg::custom("Working", 199, text)));
	}

	fn on_end(&mut self) {
		self.bar.finish();
		self.last = 0;
	}

	fn on_status(&mut self, text: &str) { Msg::info(text).eprint(); }

	fn on_error(&mut self, text: &str) { Msg::error(text).eprint(); }
}
