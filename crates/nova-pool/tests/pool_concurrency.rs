use nova_pool::{Item, Pool};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn concurrent_saves_do_not_lose_index_entries() {
    let tmp = TempDir::new().unwrap();
    let pool = Arc::new(Pool::new(tmp.path()));

    let threads = 16;
    let iters = 10;
    let handles: Vec<_> = (0..threads)
        .map(|thread_id| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for i in 0..iters {
                    let mut item = Item::new(format!("t{thread_id}.{i}")).unwrap();
                    item.set(format!("value {thread_id} {i}").into_bytes());
                    assert!(pool.save(&item));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reopened = Pool::new(tmp.path());
    assert_eq!(reopened.len(), threads * iters);
    for thread_id in 0..threads {
        for i in 0..iters {
            let item = reopened.get_item(&format!("t{thread_id}.{i}")).unwrap();
            assert!(item.is_hit(), "missing t{thread_id}.{i}");
            assert_eq!(
                item.get(),
                Some(format!("value {thread_id} {i}").as_bytes())
            );
        }
    }
}

#[test]
fn concurrent_batches_and_deletes_leave_a_consistent_index() {
    let tmp = TempDir::new().unwrap();
    let pool = Arc::new(Pool::new(tmp.path()));

    let handles: Vec<_> = (0..8)
        .map(|thread_id| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let keys: Vec<String> = (0..5).map(|i| format!("b{thread_id}.{i}")).collect();
                let items = pool.get_items(&keys).unwrap();
                assert_eq!(items.len(), keys.len());
                if thread_id % 2 == 0 {
                    assert!(pool.delete_items(&keys).unwrap());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reopened = Pool::new(tmp.path());
    assert_eq!(reopened.len(), 4 * 5);
    for key in reopened.keys() {
        assert!(reopened.has_item(&key).unwrap(), "{key} indexed without a file");
    }
}
