/*!
# Disc Dump
*/

#![forbid(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]



mod cli;

use dactyl::NiceU32;
use discdump_core::{
	Drive,
	DumpError,
	DumpReport,
	Dumper,
	KillSwitch,
	ProglessSink,
	RawImage,
};
use fyi_msg::Msg;
use std::{
	path::Path,
	process::ExitCode,
};
use utc2k::FmtUtc2k;



/// # A Divider Line.
///
/// This is used to encase the drive vendor/model during summary. We'll slice
/// it to match the length rather than `"-".repeat()` or whatever.
const DIVIDER: &str = "------------------------";



/// # Main.
///
/// This lets us bubble up startup errors so they can be pretty-printed.
fn main() -> ExitCode {
	match main__() {
		Ok(()) => ExitCode::SUCCESS,
		Err(e @ (DumpError::PrintHelp | DumpError::PrintVersion)) => {
			println!("{e}");
			ExitCode::SUCCESS
		},
		Err(e) => {
			Msg::from(e).eprint();
			ExitCode::FAILURE
		},
	}
}

#[inline]
/// # Actual Main.
///
/// This does all the stuff.
fn main__() -> Result<(), DumpError> {
	let settings = cli::parse()?;

	// Diagnostics go through the log facade; RUST_LOG still wins.
	let _res = env_logger::builder()
		.filter_level(
			if settings.verbose { log::LevelFilter::Debug }
			else { log::LevelFilter::Warn }
		)
		.parse_default_env()
		.try_init();

	let mut drive = open_drive(settings.dev.as_deref())?;

	// CTRL+C flips the kill switch so the read loops can save and stop.
	let killed = KillSwitch::default();
	let handler = killed.clone();
	ctrlc::set_handler(move || handler.kill())
		.map_err(|_| DumpError::Bug("Unable to intercept CTRL+C"))?;

	let mut image = RawImage::new(&settings.output);
	if ! settings.opts.subchannel() { image = image.without_subchannel(); }

	let mut dumper = Dumper::new(&mut *drive, &mut image, settings.opts)
		.with_progress(ProglessSink::new())
		.with_kill_switch(killed.clone());

	// Summarize.
	if settings.no_dump || ! settings.no_summary {
		let survey = dumper.survey()?;
		if let Some(vm) = survey.vendor_model {
			let vm = vm.to_string();
			let len = vm.len().min(DIVIDER.len());
			eprintln!(
				"\x1b[2;36m{}\x1b[0m\n\x1b[1;36m{vm}\x1b[0m\n\x1b[2;36m{}\x1b[0m",
				&DIVIDER[..len],
				&DIVIDER[..len],
			);
		}
		eprintln!("{survey}");
	}

	// Go ahead and leave if there's no dumping to do.
	if settings.no_dump { return Ok(()); }

	Msg::custom("Disc Dump", 199, &format!(
		"Dumping to {}.* on {}.",
		settings.output.display(),
		FmtUtc2k::now(),
	)).eprint();

	let report = dumper.with_paths(&settings.output)?.dump()?;
	print_report(&report);

	if report.aborted { Err(DumpError::Killed) }
	else { Ok(()) }
}

#[cfg(feature = "cdio")]
/// # Open Drive.
fn open_drive(dev: Option<&Path>) -> Result<Box<dyn Drive>, DumpError> {
	Ok(Box::new(discdump_core::CdioDrive::new(dev)?))
}

#[cfg(not(feature = "cdio"))]
/// # Open Drive.
fn open_drive(_dev: Option<&Path>) -> Result<Box<dyn Drive>, DumpError> {
	Err(DumpError::Capability("This build has no drive support; enable the cdio feature."))
}



#[allow(clippy::cast_possible_truncation)]
/// # Print Report.
fn print_report(report: &DumpReport) {
	eprintln!("\nTracks:");
	for t in &report.tracks { eprintln!("  {t}"); }

	let offset = report.offset.map_or_else(
		|| "unknown".to_owned(),
		|o| format!("{} samples ({})", o.samples(), report.offset_source.as_str()),
	);
	eprintln!(
		"\nMedia:        {}\nRead offset:  {offset}\nSpeed:        {:.2} / {:.2} / {:.2} MiB/s (min/avg/max)",
		report.geometry.media_type,
		report.speed_min,
		report.speed_avg,
		report.speed_max,
	);
	if let Some(mcn) = &report.mcn { eprintln!("MCN:          {mcn}"); }
	eprintln!();

	if report.inexact_positioning {
		Msg::warning("Some pregaps could not be pinned down exactly; see the log for details.").eprint();
	}

	if report.aborted {
		Msg::warning("The dump was stopped early; run it again to pick up where it left off.").eprint();
	}
	else if report.bad_blocks.is_empty() {
		Msg::success(format!(
			"Dumped {} sectors in {}.",
			NiceU32::from(report.geometry.blocks),
			report.nice_elapsed(),
		)).eprint();
	}
	else {
		Msg::warning(format!(
			"Dumped {} sectors in {}, but {} could not be read.",
			NiceU32::from(report.geometry.blocks),
			report.nice_elapsed(),
			NiceU32::from(report.bad_blocks.len() as u32),
		)).eprint();
	}
}
