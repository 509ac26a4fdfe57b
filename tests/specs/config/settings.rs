//! Settings specs
//!
//! A store built from a settings file uses the configured keys and
//! holder identity.

use crate::prelude::*;
use std::io::Write;

#[test]
fn store_from_settings_file_uses_configured_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
prefix = "exhibitor"
holder = "zk-node-1"
lock_wait = "2s"
retry_delay = "10ms"
"#
    )
    .unwrap();
    let settings = StoreSettings::load(file.path()).unwrap();

    let kv = MemoryKvStore::new();
    let store = VersionedConfigStore::new(kv.clone(), &settings, Arc::new(TracingActivityLog))
        .unwrap();
    store.store(&payload("X=1"), Version::ZERO).unwrap().unwrap();

    assert_eq!(store.lock_key(), "exhibitor/lock");
    assert_eq!(store.holder(), HolderId::new("zk-node-1"));
    assert_eq!(kv.value("exhibitor/config").as_deref(), Some("X=1\n"));
    assert_eq!(kv.value("exhibitor/lock").as_deref(), Some(SENTINEL));
}

#[test]
fn sentinel_as_holder_is_refused() {
    let settings = StoreSettings::default().with_holder(SENTINEL);
    let result = VersionedConfigStore::new(
        MemoryKvStore::new(),
        &settings,
        Arc::new(TracingActivityLog),
    );
    assert!(result.is_err());
}
