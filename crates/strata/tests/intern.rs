//! Tests for name interning: deduplication, limits, snapshots and shared access.

use std::{sync::Arc, thread};

use pretty_assertions::assert_eq;
use strata::{
    MAX_NAME_HANDLES, NameHandle, ResourceError, ResourceLimits, SharedInterner, SnapshotError, StaticNames,
    StringInterner, global_interner,
};
use strum::{EnumCount, IntoEnumIterator};

#[test]
fn distinct_strings_get_distinct_handles_that_resolve_back() {
    let mut interner = StringInterner::new();
    let names: Vec<String> = (0..1_000).map(|i| format!("name_{i}")).collect();
    let handles: Vec<NameHandle> = names.iter().map(|name| interner.intern(name).unwrap()).collect();

    let mut unique = handles.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), names.len());
    assert!(handles.iter().all(|handle| !handle.is_empty()));

    for (name, &handle) in names.iter().zip(&handles) {
        assert_eq!(interner.resolve(handle), name);
        assert_eq!(interner.intern(name).unwrap(), handle);
    }
    assert_eq!(interner.len(), StaticNames::COUNT + names.len());
}

#[test]
fn static_names_agree_across_interners() {
    let mut first = StringInterner::new();
    let mut second = StringInterner::new();
    first.intern("only_in_first").unwrap();
    for name in StaticNames::iter() {
        assert_eq!(first.lookup(name.as_str()), second.lookup(name.as_str()));
        assert_eq!(second.intern(name.as_str()).unwrap(), NameHandle::from(name));
    }
    assert_eq!(second.interned_name_count(), 0);
}

#[test]
fn configured_limit_stops_interning() {
    let limits = ResourceLimits::new().max_interned_names(StaticNames::COUNT + 3);
    let mut interner = StringInterner::with_limits(&limits);
    for i in 0..3 {
        interner.intern(&format!("n{i}")).unwrap();
    }
    let err = interner.intern("one_too_many").unwrap_err();
    assert_eq!(
        err,
        ResourceError::InternTable {
            limit: StaticNames::COUNT + 3
        }
    );
    assert_eq!(interner.lookup("one_too_many"), None);
}

#[test]
fn snapshot_restores_every_handle() {
    let mut interner = StringInterner::new();
    let handles: Vec<(NameHandle, String)> = ["alpha", "beta", "gamma", "__init__", "delta"]
        .iter()
        .map(|name| (interner.intern(name).unwrap(), (*name).to_owned()))
        .collect();

    let mut restored = StringInterner::from_bytes(&interner.to_bytes()).unwrap();
    for (handle, name) in &handles {
        assert_eq!(restored.resolve(*handle), name);
        assert_eq!(restored.intern(name).unwrap(), *handle);
    }
    assert_eq!(restored.len(), interner.len());
    assert_eq!(restored.limit(), interner.limit());
    // the next fresh name continues the sequence
    assert_eq!(restored.intern("epsilon").unwrap(), interner.intern("epsilon").unwrap());
}

#[test]
fn snapshot_with_duplicate_is_rejected() {
    let mut names: Vec<&str> = StaticNames::iter().map(StaticNames::as_str).collect();
    names.push("twice");
    names.push("twice");
    let bytes = postcard::to_allocvec(&(1_000usize, names)).unwrap();
    let err = StringInterner::from_bytes(&bytes).unwrap_err();
    assert!(matches!(&err, SnapshotError::Duplicate(name) if name == "twice"));
    assert_eq!(err.to_string(), "interner snapshot contains \"twice\" twice");
}

#[test]
fn shared_interner_is_consistent_across_threads() {
    let shared = SharedInterner::default();
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                (0..200)
                    .map(|i| {
                        // half the names are shared between all workers
                        let name = if i % 2 == 0 { format!("common_{i}") } else { format!("w{worker}_{i}") };
                        (shared.intern(&name).unwrap(), name)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<Vec<(NameHandle, String)>> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    for pairs in &results {
        for (handle, name) in pairs {
            assert_eq!(&*shared.resolve(*handle), name.as_str());
        }
    }
    // 100 common names plus 100 private names per worker
    shared.with(|interner| assert_eq!(interner.interned_name_count(), 100 + 4 * 100));
}

#[test]
fn resolved_content_outlives_later_interning() {
    let shared = SharedInterner::new(StringInterner::new());
    let handle = shared.intern("stable").unwrap();
    let content: Arc<str> = shared.resolve(handle);
    for i in 0..5_000 {
        shared.intern(&format!("filler_{i}")).unwrap();
    }
    assert_eq!(&*content, "stable");
    assert_eq!(shared.lookup("stable"), Some(handle));
}

#[test]
fn global_interner_is_process_wide() {
    let a = global_interner().intern("global_test_name").unwrap();
    let b = thread::spawn(|| global_interner().intern("global_test_name").unwrap())
        .join()
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(&*global_interner().resolve(a), "global_test_name");
}

#[test]
fn default_interner_fills_every_handle_then_refuses() {
    let mut interner = StringInterner::new();
    assert_eq!(interner.limit(), MAX_NAME_HANDLES);
    let mut last = NameHandle::EMPTY;
    for i in 0..MAX_NAME_HANDLES - StaticNames::COUNT {
        last = interner.intern(&format!("n{i}")).unwrap();
    }
    assert_eq!(interner.len(), MAX_NAME_HANDLES);
    assert_eq!(last.raw(), u16::MAX);
    assert_eq!(interner.resolve(last), format!("n{}", MAX_NAME_HANDLES - StaticNames::COUNT - 1));

    assert_eq!(
        interner.intern("one_more"),
        Err(ResourceError::InternTable {
            limit: MAX_NAME_HANDLES
        })
    );
    // names already present are still served at the ceiling
    assert_eq!(interner.intern("n0").unwrap().raw(), u16::try_from(StaticNames::COUNT + 1).unwrap());
}
