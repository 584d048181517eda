// Run locally (from the repo root):
//   cargo +nightly fuzz run fuzz_pool_files -- -runs=1000
#![no_main]

use libfuzzer_sys::fuzz_target;
use nova_pool::{Item, Pool, INDEX_FILE_NAME};

mod utils;

fuzz_target!(|data: &[u8]| {
    let mode = data.first().copied().unwrap_or(0);
    let payload = utils::truncate(data.get(1..).unwrap_or(&[]));

    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let pool = Pool::new(dir.path());
    let mut item = Item::new("fuzz").expect("valid key");
    item.set(b"seed".to_vec());
    assert!(pool.save(&item));
    drop(pool);

    // Oracle: arbitrary bytes in either pool file must read as a miss or a hit, never panic.
    let target = if mode & 1 == 0 {
        dir.path().join(INDEX_FILE_NAME)
    } else {
        dir.path().join("fuzz.item")
    };
    std::fs::write(&target, payload).expect("failed to write fuzz payload");

    let pool = Pool::new(dir.path());
    let _ = pool.has_item("fuzz");
    let item = pool.get_item("fuzz").expect("valid key");
    if item.is_hit() {
        assert!(item.get().is_some());
    }
    let _ = pool.get_items(["fuzz", "other"]);
    assert!(pool.clear());
});
