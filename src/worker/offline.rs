//! Key generation without balance lookups.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::crypto::{generate_key_and_address, CryptoError, KeyRecord};

/// Generates `count` keys on `pool` and hands each record to `emit`.
///
/// Records are passed on as they are produced and never collected. Returns
/// the number of records emitted, which is less than `count` if `stop_flag`
/// was raised.
pub fn draw_offline<F>(
    pool: &ThreadPool,
    count: u64,
    stop_flag: &AtomicBool,
    emit: F,
) -> Result<u64, CryptoError>
where
    F: Fn(&KeyRecord) + Sync + Send,
{
    let produced = AtomicU64::new(0);

    pool.install(|| {
        (0..count)
            .into_par_iter()
            .try_for_each(|_| -> Result<(), CryptoError> {
                if stop_flag.load(Ordering::Relaxed) {
                    return Ok(());
                }
                let record = generate_key_and_address()?;
                emit(&record);
                produced.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
    })?;

    Ok(produced.into_inner())
}

/// Builds the thread pool used by [`draw_offline`].
pub fn offline_pool(num_threads: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|id| format!("lottery-offline-{}", id))
        .build()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_emits_each_record() {
        let stop = AtomicBool::new(false);
        let addresses = Mutex::new(HashSet::new());

        let pool = offline_pool(2).unwrap();
        let produced = draw_offline(&pool, 50, &stop, |record| {
            addresses.lock().unwrap().insert(record.address.clone());
        })
        .unwrap();

        assert_eq!(produced, 50);
        assert_eq!(addresses.lock().unwrap().len(), 50);
    }

    #[test]
    fn test_stop_flag_skips_work() {
        let stop = AtomicBool::new(true);
        let pool = offline_pool(1).unwrap();
        let produced =
            draw_offline(&pool, 10, &stop, |_| panic!("nothing should be emitted")).unwrap();
        assert_eq!(produced, 0);
    }

    #[test]
    fn test_runs_on_requested_thread_count() {
        let stop = AtomicBool::new(false);
        let pool = offline_pool(3).unwrap();
        let threads = Mutex::new(HashSet::new());

        let produced = draw_offline(&pool, 200, &stop, |_| {
            let name = std::thread::current().name().map(str::to_string);
            threads.lock().unwrap().insert(name);
        })
        .unwrap();

        assert_eq!(produced, 200);
        assert_eq!(pool.current_num_threads(), 3);
        let threads = threads.into_inner().unwrap();
        assert!(threads.len() <= 3);
        assert!(threads
            .iter()
            .all(|name| name.as_deref().is_some_and(|n| n.starts_with("lottery-offline-"))));
    }
}
