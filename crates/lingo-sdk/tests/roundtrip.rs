//! Round-trip property tests: traverse a tree into a recording, replay the
//! recording through the construct engine, and compare.

use std::ffi::c_void;

use lingo_core::{
    construct_cdts, traverse_cdts, Callable, Cdt, Cdts, Dimensions, Handle, TypeTag, XCall,
};
use lingo_sdk::{Recording, ReplaySource};

/// A tree touching every payload kind that survives a recording.
fn sample_tree() -> Cdts {
    let mut root = Cdts::empty_root();
    root.push(Cdt::int64(-7));
    root.push(Cdt::float64(2.5));
    root.push(Cdt::bool(true));
    root.push(Cdt::string8("hello"));
    root.push(Cdt::string16("wide".encode_utf16().collect()));
    root.push(Cdt::null());
    root.push(Cdt::handle(Handle::new(0xABCD as *mut c_void, 101, None)));
    root.push(Cdt::callable(Callable::new(
        XCall::new(0x2 as *const c_void, std::ptr::null_mut()),
        vec![TypeTag::INT32],
        vec![TypeTag::FLOAT64],
    )));

    let mut inner = Cdts::with_len(3, Dimensions::Fixed(1), TypeTag::INT32);
    inner[0] = Cdt::int32(1);
    inner[1] = Cdt::int32(2);
    inner[2] = Cdt::int32(3);
    root.push(Cdt::array(inner));

    let mut ragged = Cdts::with_len(2, Dimensions::MixedOrUnknown, TypeTag::ANY);
    ragged[0] = Cdt::string8("x");
    let mut deep = Cdts::with_len(1, Dimensions::Fixed(1), TypeTag::UINT8);
    deep[0] = Cdt::uint8(255);
    ragged[1] = Cdt::array(deep);
    root.push(Cdt::array(ragged));

    root
}

fn record(tree: &Cdts) -> Recording {
    let mut recording = Recording::new();
    traverse_cdts(tree, &mut recording).unwrap();
    recording
}

#[test]
fn test_record_replay_rebuilds_equal_tree() {
    let original = sample_tree();
    let recording = record(&original);

    let mut rebuilt = Cdts::empty_root();
    construct_cdts(&mut rebuilt, &mut ReplaySource::new(&recording)).unwrap();

    assert_eq!(rebuilt, original);
}

#[test]
fn test_replayed_tree_records_identically() {
    let original = sample_tree();
    let first = record(&original);

    let mut rebuilt = Cdts::empty_root();
    construct_cdts(&mut rebuilt, &mut ReplaySource::new(&first)).unwrap();
    let second = record(&rebuilt);

    assert_eq!(first, second);
}

#[test]
fn test_traverse_twice_identical_log() {
    let tree = sample_tree();
    assert_eq!(record(&tree), record(&tree));
}

#[test]
fn test_recorded_paths_strictly_increase() {
    let tree = sample_tree();
    let recording = record(&tree);
    let paths: Vec<Vec<u64>> = recording.paths().map(|p| p.to_vec()).collect();
    assert!(!paths.is_empty());
    for pair in paths.windows(2) {
        assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
    }
}

#[test]
fn test_fast_path_replay_equivalence() {
    // 1-D f64 array, the canonical bulk-eligible shape
    let mut root = Cdts::empty_root();
    let mut arr = Cdts::with_len(1024, Dimensions::Fixed(1), TypeTag::FLOAT64);
    for i in 0..1024 {
        arr[i] = Cdt::float64(i as f64 * 0.25);
    }
    root.push(Cdt::array(arr));

    let recording = record(&root);

    let mut per_element = Cdts::empty_root();
    construct_cdts(&mut per_element, &mut ReplaySource::new(&recording)).unwrap();

    let mut bulk = Cdts::empty_root();
    construct_cdts(&mut bulk, &mut ReplaySource::with_fast_path(&recording)).unwrap();

    assert_eq!(per_element, root);
    assert_eq!(bulk, root);
}

#[test]
fn test_empty_root_roundtrip() {
    let empty = Cdts::empty_root();
    let recording = record(&empty);
    assert!(recording.calls().is_empty());

    let mut rebuilt = Cdts::empty_root();
    construct_cdts(&mut rebuilt, &mut ReplaySource::new(&recording)).unwrap();
    assert!(rebuilt.is_empty());
}

#[test]
fn test_empty_array_leaf_roundtrip() {
    let mut root = Cdts::empty_root();
    root.push(Cdt::array(Cdts::new(Dimensions::Fixed(1), TypeTag::INT32)));

    let recording = record(&root);
    assert_eq!(recording.calls().len(), 1);

    let mut rebuilt = Cdts::empty_root();
    construct_cdts(&mut rebuilt, &mut ReplaySource::new(&recording)).unwrap();
    assert_eq!(rebuilt, root);
}

#[test]
fn test_null_at_nested_path_roundtrips() {
    let mut inner = Cdts::with_len(2, Dimensions::MixedOrUnknown, TypeTag::ANY);
    inner[0] = Cdt::int32(1);
    inner[1] = Cdt::null();
    let mut root = Cdts::empty_root();
    root.push(Cdt::array(inner));

    let recording = record(&root);
    let mut rebuilt = Cdts::empty_root();
    construct_cdts(&mut rebuilt, &mut ReplaySource::new(&recording)).unwrap();
    assert_eq!(rebuilt, root);
}

#[test]
fn test_replayed_handle_is_transport_copy() {
    let mut root = Cdts::empty_root();
    root.push(Cdt::handle(Handle::new(0xF00D as *mut c_void, 7, None)));

    let recording = record(&root);
    let mut rebuilt = Cdts::empty_root();
    construct_cdts(&mut rebuilt, &mut ReplaySource::new(&recording)).unwrap();

    // equal by (raw, runtime_id); the replayed copy carries no releaser
    assert_eq!(rebuilt, root);
    match rebuilt[0].value() {
        lingo_core::CdtValue::Handle(h) => assert!(!h.has_releaser()),
        other => panic!("expected handle, got {other:?}"),
    }
}
