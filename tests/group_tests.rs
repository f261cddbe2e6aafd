//! Group Scenario Tests
//!
//! End-to-end checks of the get protocol with in-memory stand-ins for the
//! origin and for remote peers: cache hits, delegation to the owning peer,
//! fallback to the origin when the peer fails, and input validation.

use peercache::config::GroupConfig;
use peercache::group::getter_fn;
use peercache::{
    ByteView, CacheMetrics, Error, Group, GroupStats, PeerGetter, PeerPicker, Registry, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// A remote peer with a fixed answer per key; unknown keys fail.
struct FakePeer {
    values: HashMap<&'static str, &'static str>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakePeer {
    fn new(values: &[(&'static str, &'static str)]) -> Arc<Self> {
        Arc::new(FakePeer {
            values: values.iter().copied().collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl PeerGetter for FakePeer {
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .push((group.to_string(), key.to_string()));
        match self.values.get(key) {
            Some(value) => Ok(value.as_bytes().to_vec()),
            None => Err(Error::PeerStatus {
                status: 500,
                status_text: "Internal Server Error".to_string(),
            }),
        }
    }
}

/// Routes every key to one remote peer.
struct AlwaysRemote(Arc<FakePeer>);

impl PeerPicker for AlwaysRemote {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
        Some(self.0.clone())
    }
}

/// Routes keys with the given prefix to a remote peer, the rest locally.
struct ByPrefix {
    prefix: &'static str,
    peer: Arc<FakePeer>,
}

impl PeerPicker for ByPrefix {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        if key.starts_with(self.prefix) {
            Some(self.peer.clone())
        } else {
            None
        }
    }
}

/// An `images` group backed by a counting origin.
fn images_group(config: GroupConfig, calls: Arc<AtomicUsize>) -> Group {
    Group::new(
        config,
        getter_fn(move |key| {
            calls.fetch_add(1, Ordering::SeqCst);
            match key {
                "k1" => Ok(b"ABC".to_vec()),
                "k2" => Ok(b"LOCAL".to_vec()),
                _ => Err(format!("{key} not exist").into()),
            }
        }),
    )
}

fn images_config() -> GroupConfig {
    GroupConfig {
        cache_bytes: 1024,
        ..GroupConfig::new("images")
    }
}

// ============================================================================
// LOCAL LOADS
// ============================================================================

#[test]
fn test_first_get_loads_second_get_hits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let group = images_group(images_config(), Arc::clone(&calls));

    assert_eq!(group.get("k1").unwrap(), "ABC");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(group.get("k1").unwrap(), "ABC");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(GroupStats::load(&group.stats().cache_hits), 1);
}

#[test]
fn test_empty_key_touches_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let peer = FakePeer::new(&[("", "never")]);
    let group = images_group(images_config(), Arc::clone(&calls));
    group
        .register_peers(Arc::new(AlwaysRemote(peer.clone())))
        .unwrap();

    let err = group.get("").unwrap_err();
    assert!(matches!(err, Error::EmptyKey));
    assert_eq!(err.to_string(), "key is required");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(peer.requests().is_empty());
    assert_eq!(group.main_cache().core_metrics().requests, 0);
}

#[test]
fn test_origin_error_propagates_verbatim() {
    let calls = Arc::new(AtomicUsize::new(0));
    let group = images_group(images_config(), Arc::clone(&calls));

    let err = group.get("unknown").unwrap_err();
    assert_eq!(err.to_string(), "unknown not exist");
    // Not cached: the next get retries the origin.
    assert!(group.get("unknown").is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_returned_copy_does_not_alter_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let group = images_group(images_config(), Arc::clone(&calls));

    let view = group.get("k1").unwrap();
    let mut bytes = view.byte_slice();
    bytes[0] = b'X';
    bytes.push(b'!');

    assert_eq!(group.get("k1").unwrap(), "ABC");
    assert_eq!(view, "ABC");
}

#[test]
fn test_budget_evicts_old_keys() {
    let group = Group::new(
        GroupConfig {
            cache_bytes: 32,
            ..GroupConfig::new("big")
        },
        getter_fn(|key| Ok(vec![b'x'; 10 + key.len()])),
    );
    for i in 0..10 {
        group.get(&format!("key{i}")).unwrap();
        assert!(group.main_cache().nbytes() <= 32);
    }
    assert!(group.main_cache().len() < 10);
}

// ============================================================================
// PEER DELEGATION
// ============================================================================

#[test]
fn test_remote_owner_serves_value() {
    let calls = Arc::new(AtomicUsize::new(0));
    let peer = FakePeer::new(&[("k2", "XYZ")]);
    let group = images_group(images_config(), Arc::clone(&calls));
    group
        .register_peers(Arc::new(AlwaysRemote(peer.clone())))
        .unwrap();

    assert_eq!(group.get("k2").unwrap(), "XYZ");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        peer.requests(),
        vec![("images".to_string(), "k2".to_string())]
    );

    // Peer results are not cached by default, so the peer is asked again.
    assert_eq!(group.get("k2").unwrap(), "XYZ");
    assert_eq!(peer.requests().len(), 2);
    assert!(group.main_cache().is_empty());
    assert_eq!(GroupStats::load(&group.stats().peer_loads), 2);
}

#[test]
fn test_peer_failure_falls_back_to_origin() {
    let calls = Arc::new(AtomicUsize::new(0));
    let peer = FakePeer::new(&[]);
    let group = images_group(images_config(), Arc::clone(&calls));
    group
        .register_peers(Arc::new(AlwaysRemote(peer.clone())))
        .unwrap();

    assert_eq!(group.get("k2").unwrap(), "LOCAL");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(peer.requests().len(), 1);
    assert_eq!(GroupStats::load(&group.stats().peer_errors), 1);

    // The fallback value is cached locally.
    assert_eq!(group.get("k2").unwrap(), "LOCAL");
    assert_eq!(peer.requests().len(), 1);
}

#[test]
fn test_peer_and_origin_failure_surfaces_origin_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let group = images_group(images_config(), Arc::clone(&calls));
    group
        .register_peers(Arc::new(AlwaysRemote(FakePeer::new(&[]))))
        .unwrap();

    let err = group.get("k9").unwrap_err();
    assert!(matches!(err, Error::Origin(_)));
    assert_eq!(err.to_string(), "k9 not exist");
}

#[test]
fn test_local_keys_skip_the_peer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let peer = FakePeer::new(&[("remote-1", "R1")]);
    let group = images_group(images_config(), Arc::clone(&calls));
    group
        .register_peers(Arc::new(ByPrefix {
            prefix: "remote-",
            peer: peer.clone(),
        }))
        .unwrap();

    assert_eq!(group.get("remote-1").unwrap(), "R1");
    assert_eq!(group.get("k1").unwrap(), "ABC");
    assert_eq!(peer.requests().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cache_peer_loads_policy() {
    let calls = Arc::new(AtomicUsize::new(0));
    let peer = FakePeer::new(&[("k2", "XYZ")]);
    let group = images_group(
        GroupConfig {
            cache_peer_loads: true,
            ..images_config()
        },
        Arc::clone(&calls),
    );
    group
        .register_peers(Arc::new(AlwaysRemote(peer.clone())))
        .unwrap();

    assert_eq!(group.get("k2").unwrap(), "XYZ");
    assert_eq!(group.get("k2").unwrap(), "XYZ");
    assert_eq!(peer.requests().len(), 1);
    assert_eq!(group.main_cache().get("k2"), Some(ByteView::from("XYZ")));
}

// ============================================================================
// REGISTRY
// ============================================================================

#[test]
fn test_registry_lookup_and_metrics() {
    let registry = Registry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    registry
        .new_group(
            images_config(),
            getter_fn(move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(b"ABC".to_vec())
            }),
        )
        .unwrap();

    let group = registry.get_group("images").unwrap();
    group.get("k1").unwrap();
    group.get("k1").unwrap();

    let metrics = group.metrics();
    assert_eq!(metrics["gets"], 2.0);
    assert_eq!(metrics["cache_hits"], 1.0);
    assert_eq!(metrics["local_loads"], 1.0);
    assert_eq!(metrics["main_cache.insertions"], 1.0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(matches!(
        registry.new_group(images_config(), getter_fn(|_| Ok(Vec::new()))),
        Err(Error::DuplicateGroup(_))
    ));
}
