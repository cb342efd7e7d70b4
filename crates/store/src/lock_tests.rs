// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn lock_path_appends_suffix() {
    let p = lock_path(Path::new("/data/runtime/system_state.json"));
    assert_eq!(p, PathBuf::from("/data/runtime/system_state.json.lock"));
}

#[test]
fn acquire_and_release() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("state.json");

    let guard = FileLock::acquire(&target, Duration::from_millis(100)).unwrap();
    assert!(guard.path().exists());
    drop(guard);

    // Re-acquirable after release
    let again = FileLock::acquire(&target, Duration::from_millis(100));
    assert!(again.is_ok());
}

#[test]
fn second_acquisition_times_out_while_held() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("state.json");

    let _held = FileLock::acquire(&target, Duration::from_millis(100)).unwrap();
    let err = FileLock::acquire(&target, Duration::from_millis(80)).unwrap_err();
    match err {
        LockError::Timeout { waited_ms, .. } => assert!(waited_ms >= 80),
        other => panic!("expected timeout, got {other:?}"),
    }
}
