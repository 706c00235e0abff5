use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::debug;

/// Worker pool for CPU-bound work that can run on independent chunks.
pub struct JobSystem {
    pool: ThreadPool,
}

impl JobSystem {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|index| format!("voxgrove-job-{index}"));
        if let Some(count) = num_threads {
            builder = builder.num_threads(count.max(1));
        }

        let pool = builder.build()?;
        debug!("Job system started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `job` over every item on the pool. Output order matches input order.
    pub fn map_batch<T, R, F>(&self, items: Vec<T>, job: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        self.pool
            .install(|| items.into_par_iter().map(job).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_thread_count_is_honored() {
        let jobs = JobSystem::new(Some(2)).expect("pool");
        assert_eq!(jobs.thread_count(), 2);
    }

    #[test]
    fn zero_threads_is_clamped_to_one() {
        let jobs = JobSystem::new(Some(0)).expect("pool");
        assert_eq!(jobs.thread_count(), 1);
    }

    #[test]
    fn map_batch_preserves_input_order() {
        let jobs = JobSystem::new(Some(3)).expect("pool");
        let doubled = jobs.map_batch((0..64).collect(), |value: i32| value * 2);
        let expected: Vec<i32> = (0..64).map(|value| value * 2).collect();
        assert_eq!(doubled, expected);
    }
}
