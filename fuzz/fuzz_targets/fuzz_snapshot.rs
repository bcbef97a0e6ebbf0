#![no_main]
use libfuzzer_sys::fuzz_target;
use stance_physics::Snapshot;

// Arbitrary bytes must be rejected cleanly; anything accepted must encode
// back to the same bytes.
fuzz_target!(|data: &[u8]| {
    if let Ok(snapshot) = Snapshot::from_bytes(data) {
        let bytes = snapshot.to_bytes();
        assert_eq!(bytes.as_slice(), data);
        assert!(Snapshot::from_bytes(&bytes).is_ok());
    }
});
