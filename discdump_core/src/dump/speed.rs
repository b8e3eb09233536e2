/*!
# Disc Dump: Read Speed
*/

use std::time::{
	Duration,
	Instant,
};



/// # Bytes Per MiB.
const MIB: f64 = 1_048_576.0;

/// # Reporting Window.
const WINDOW: Duration = Duration::from_secs(1);



#[derive(Debug, Clone, Copy)]
/// # Speed Tracker.
///
/// Keeps a rolling per-second rate for progress display, the fastest and
/// slowest single commands ("bursts"), and totals for the final average.
pub(super) struct Speed {
	window_start: Instant,
	window_bytes: u64,
	current: f64,
	min: Option<f64>,
	max: f64,
	total_bytes: u64,
	read_time: Duration,
	write_time: Duration,
}

impl Speed {
	/// # New.
	pub(super) fn new() -> Self {
		Self {
			window_start: Instant::now(),
			window_bytes: 0,
			current: 0.0,
			min: None,
			max: 0.0,
			total_bytes: 0,
			read_time: Duration::ZERO,
			write_time: Duration::ZERO,
		}
	}

	#[allow(clippy::cast_precision_loss)]
	/// # Record a Read.
	///
	/// Returns `true` if the window rolled over and [`Speed::current`]
	/// changed.
	pub(super) fn record(&mut self, bytes: u64, took: Duration) -> bool {
		self.total_bytes += bytes;
		self.read_time += took;

		let secs = took.as_secs_f64();
		if 0.0 < secs {
			let burst = bytes as f64 / MIB / secs;
			if burst > self.max { self.max = burst; }
			if self.min.map_or(true, |m| burst < m) { self.min.replace(burst); }
		}

		self.window_bytes += bytes;
		self.tick(Instant::now())
	}

	#[allow(clippy::cast_precision_loss)]
	/// # Roll the Window.
	pub(super) fn tick(&mut self, now: Instant) -> bool {
		let elapsed = now.saturating_duration_since(self.window_start);
		if elapsed < WINDOW { return false; }
		self.current = self.window_bytes as f64 / MIB / elapsed.as_secs_f64();
		self.window_bytes = 0;
		self.window_start = now;
		true
	}

	/// # Record a Write.
	pub(super) fn record_write(&mut self, took: Duration) { self.write_time += took; }

	/// # Current Rate (MiB/s).
	pub(super) const fn current(&self) -> f64 { self.current }

	/// # Slowest Burst (MiB/s).
	pub(super) fn min(&self) -> f64 { self.min.unwrap_or(0.0) }

	/// # Fastest Burst (MiB/s).
	pub(super) const fn max(&self) -> f64 { self.max }

	#[allow(clippy::cast_precision_loss)]
	/// # Average Rate (MiB/s).
	///
	/// Time spent waiting on the drive only.
	pub(super) fn average(&self) -> f64 {
		let secs = self.read_time.as_secs_f64();
		if secs == 0.0 { 0.0 }
		else { self.total_bytes as f64 / MIB / secs }
	}

	/// # Time Spent Writing.
	pub(super) const fn write_time(&self) -> Duration { self.write_time }
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_bursts() {
		let mut speed = Speed::new();
		speed.record(1_048_576, Duration::from_secs(1));
		speed.record(1_048_576, Duration::from_millis(250));
		speed.record(1_048_576, Duration::from_secs(2));

		assert!((speed.max() - 4.0).abs() < 0.001, "Max burst should be 4 MiB/s.");
		assert!((speed.min() - 0.5).abs() < 0.001, "Min burst should be 0.5 MiB/s.");

		// 3 MiB over 3.25 seconds.
		assert!((speed.average() - 3.0 / 3.25).abs() < 0.001, "Bad average.");
	}

	#[test]
	fn t_window() {
		let mut speed = Speed::new();
		let start = speed.window_start;
		speed.window_bytes = 2 * 1_048_576;
		assert!(! speed.tick(start + Duration::from_millis(500)), "Window rolled early.");
		assert!(speed.tick(start + Duration::from_secs(2)), "Window did not roll.");
		assert!((speed.current() - 1.0).abs() < 0.001, "Expected 1 MiB/s.");
		assert_eq!(speed.window_bytes, 0);
	}

	#[test]
	fn t_empty() {
		let speed = Speed::new();
		assert!(speed.average().abs() < f64::EPSILON);
		assert!(speed.min().abs() < f64::EPSILON);
		assert_eq!(speed.write_time(), Duration::ZERO);
	}
}
