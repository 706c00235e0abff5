pub mod jobs;
pub mod work_queue;

pub use jobs::JobSystem;
pub use work_queue::WorkQueue;
