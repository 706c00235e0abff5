use rayon::ThreadPoolBuildError;
use tracing::info;
use voxgrove_core::JobSystem;
use voxgrove_shared::coords::ChunkPos;
use voxgrove_shared::lighting::LightAccess;
use voxgrove_shared::storage::BlockAccess;

use crate::config::MeshingConfig;
use crate::renderer::mesh::{generate_mesh, ChunkMesh, MeshSettings};

pub struct MeshedChunk {
    pub chunk_pos: ChunkPos,
    pub mesh: ChunkMesh,
}

/// Turns batches of dirty chunks into meshes, on the job pool when one is configured.
///
/// Every job only reads the world and lights, so one shared borrow of each covers
/// the whole batch.
pub struct MeshWorker {
    jobs: Option<JobSystem>,
    settings: MeshSettings,
}

impl MeshWorker {
    pub fn new(config: &MeshingConfig, settings: MeshSettings) -> Result<Self, ThreadPoolBuildError> {
        let jobs = if config.parallel {
            let jobs = JobSystem::new(config.worker_threads)?;
            info!("Meshing on {} worker threads", jobs.thread_count());
            Some(jobs)
        } else {
            None
        };
        Ok(Self { jobs, settings })
    }

    pub fn settings(&self) -> &MeshSettings {
        &self.settings
    }

    pub fn jobs(&self) -> Option<&JobSystem> {
        self.jobs.as_ref()
    }

    /// Meshes every chunk in `chunks`. Output order matches input order.
    pub fn mesh_chunks<W, L>(&self, world: &W, lights: &L, chunks: Vec<ChunkPos>) -> Vec<MeshedChunk>
    where
        W: BlockAccess + Sync + ?Sized,
        L: LightAccess + Sync + ?Sized,
    {
        let settings = &self.settings;
        let job = |chunk_pos: ChunkPos| MeshedChunk {
            chunk_pos,
            mesh: generate_mesh(world, lights, chunk_pos, settings),
        };

        match &self.jobs {
            Some(jobs) if chunks.len() > 1 => jobs.map_batch(chunks, job),
            _ => chunks.into_iter().map(job).collect(),
        }
    }
}
