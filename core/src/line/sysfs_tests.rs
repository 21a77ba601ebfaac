use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;

use super::spec::{Direction, Edge, LineOptions, LineSpec, LineValue};
use super::sysfs::SysfsDriver;
use super::{HardwareError, LineDriver, LineHandle};
use crate::registry::BindingKey;

/// Lay out a fake sysfs tree with `gpio<line>` already exported.
fn fake_sysfs(root: &Path, line: u32, value: &str) {
	std::fs::write(root.join("export"), "").unwrap();
	std::fs::write(root.join("unexport"), "").unwrap();
	let dir = root.join(format!("gpio{line}"));
	std::fs::create_dir(&dir).unwrap();
	std::fs::write(dir.join("direction"), "in\n").unwrap();
	std::fs::write(dir.join("edge"), "none\n").unwrap();
	std::fs::write(dir.join("active_low"), "0\n").unwrap();
	std::fs::write(dir.join("value"), value).unwrap();
}

/// Replace the value attribute atomically so the sampler never sees a
/// truncated file.
fn set_value(root: &Path, line: u32, value: &str) {
	let dir = root.join(format!("gpio{line}"));
	std::fs::write(dir.join("value.tmp"), value).unwrap();
	std::fs::rename(dir.join("value.tmp"), dir.join("value")).unwrap();
}

fn attr(root: &Path, line: u32, name: &str) -> String {
	std::fs::read_to_string(root.join(format!("gpio{line}")).join(name))
		.unwrap()
		.trim()
		.to_string()
}

#[test]
fn test_accessible_only_with_export_file() {
	let tmp = tempfile::tempdir().unwrap();
	let driver = SysfsDriver::with_root(tmp.path());
	assert!(!driver.is_accessible());
	std::fs::write(tmp.path().join("export"), "").unwrap();
	assert!(driver.is_accessible());
}

#[tokio::test]
async fn test_output_line_configure_write_release() {
	let tmp = tempfile::tempdir().unwrap();
	fake_sysfs(tmp.path(), 17, "0\n");
	let driver = SysfsDriver::with_root(tmp.path());

	let spec = LineSpec::new(17, Direction::Out).with_options(LineOptions {
		active_low: true,
		..LineOptions::default()
	});
	let handle = driver.open(&spec).await.unwrap();
	assert_eq!(attr(tmp.path(), 17, "direction"), "out");
	assert_eq!(attr(tmp.path(), 17, "active_low"), "1");

	handle.write(LineValue::High).await.unwrap();
	assert_eq!(attr(tmp.path(), 17, "value"), "1");
	assert_eq!(handle.read().await.unwrap(), LineValue::High);

	handle.release().await.unwrap();
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("unexport")).unwrap(),
		"17"
	);
	assert!(matches!(
		handle.read().await,
		Err(HardwareError::Released { line: 17 })
	));
}

/// Stand in for the kernel: once `export` is written, create the line's
/// attributes with `active_low` unwritable.
async fn export_with_broken_polarity(root: std::path::PathBuf, line: u32) {
	let export = root.join("export");
	loop {
		let written = std::fs::read_to_string(&export).unwrap_or_default();
		if written.trim() == line.to_string() {
			break;
		}
		tokio::time::sleep(Duration::from_millis(1)).await;
	}
	let dir = root.join(format!("gpio{line}"));
	std::fs::create_dir(&dir).unwrap();
	std::fs::write(dir.join("direction"), "in\n").unwrap();
	std::fs::write(dir.join("value"), "0\n").unwrap();
	std::fs::create_dir(dir.join("active_low")).unwrap();
}

#[tokio::test]
async fn test_failed_open_unexports_line_it_exported() {
	let tmp = tempfile::tempdir().unwrap();
	std::fs::write(tmp.path().join("export"), "").unwrap();
	std::fs::write(tmp.path().join("unexport"), "").unwrap();
	let kernel =
		tokio::spawn(export_with_broken_polarity(tmp.path().to_path_buf(), 17));
	let driver = SysfsDriver::with_root(tmp.path());

	let result = driver.open(&LineSpec::new(17, Direction::Out)).await;
	kernel.await.unwrap();

	assert!(matches!(result, Err(HardwareError::Io { line: 17, .. })));
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("unexport")).unwrap(),
		"17"
	);
}

#[tokio::test]
async fn test_failed_open_keeps_line_exported_elsewhere() {
	let tmp = tempfile::tempdir().unwrap();
	fake_sysfs(tmp.path(), 9, "0\n");
	let dir = tmp.path().join("gpio9");
	std::fs::remove_file(dir.join("active_low")).unwrap();
	std::fs::create_dir(dir.join("active_low")).unwrap();
	let driver = SysfsDriver::with_root(tmp.path());

	assert!(driver.open(&LineSpec::new(9, Direction::In)).await.is_err());
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("unexport")).unwrap(),
		""
	);
}

#[tokio::test]
async fn test_input_line_rejects_writes_and_sets_edge() {
	let tmp = tempfile::tempdir().unwrap();
	fake_sysfs(tmp.path(), 5, "1\n");
	let driver = SysfsDriver::with_root(tmp.path());

	let spec = LineSpec::new(5, Direction::Watch).with_edge(Edge::Rising);
	let handle = driver.open(&spec).await.unwrap();
	assert_eq!(attr(tmp.path(), 5, "edge"), "rising");
	assert_eq!(handle.read().await.unwrap(), LineValue::High);
	assert!(matches!(
		handle.write(LineValue::Low).await,
		Err(HardwareError::NotWritable { line: 5 })
	));
}

#[tokio::test]
async fn test_garbage_value_is_reported() {
	let tmp = tempfile::tempdir().unwrap();
	fake_sysfs(tmp.path(), 6, "x\n");
	let driver = SysfsDriver::with_root(tmp.path());
	let handle = driver.open(&LineSpec::new(6, Direction::In)).await.unwrap();
	match handle.read().await {
		| Err(HardwareError::InvalidValue { line, value }) => {
			assert_eq!(line, 6);
			assert_eq!(value, "x");
		}
		| other => panic!("unexpected read result: {other:?}"),
	}
}

#[tokio::test]
async fn test_watch_reports_changes_until_unwatched() {
	let tmp = tempfile::tempdir().unwrap();
	fake_sysfs(tmp.path(), 4, "0\n");
	let driver = SysfsDriver::with_root(tmp.path())
		.with_poll_interval(Duration::from_millis(1));
	let handle = driver
		.open(&LineSpec::new(4, Direction::Watch))
		.await
		.unwrap();

	let (tx, mut rx) = mpsc::channel(8);
	let key = BindingKey::new(4, 1);
	handle.watch(key, tx).unwrap();
	// let the sampler take its baseline
	tokio::time::sleep(Duration::from_millis(20)).await;

	set_value(tmp.path(), 4, "1\n");
	let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
		.await
		.expect("no watch event")
		.expect("watch channel closed");
	assert_eq!(event.key, key);
	assert_eq!(event.result.unwrap(), LineValue::High);

	handle.unwatch();
	// the sampler owned the only sender
	let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
		.await
		.expect("sampler still running");
	assert!(closed.is_none());
}
