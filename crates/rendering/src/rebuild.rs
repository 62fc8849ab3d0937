//! Background facade rebuilds.
//!
//! Every edit to [`FacadeSource`] starts a new generation. The dispatch system
//! hands the newest snapshot to the async compute pool; the collect system
//! publishes a finished compile only when it belongs to the newest generation.
//! A compile superseded by a later edit is dropped, so the scene never shows a
//! stale or half-built facade.

use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task};

use facade::{compile, CompileOutput, FacadeError};

use crate::source::{FacadeSnapshot, FacadeSource};

// ---------------------------------------------------------------------------
// Generation bookkeeping
// ---------------------------------------------------------------------------

/// Last-edit-wins ordering of rebuilds, independent of the ECS.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RebuildTracker {
    dispatched: u64,
    in_flight: Option<u64>,
    published: Option<u64>,
    discarded: u32,
}

impl RebuildTracker {
    /// True when `generation` has not been handed to a compile yet.
    pub fn needs_dispatch(&self, generation: u64) -> bool {
        generation > self.dispatched
    }

    /// Record a dispatch. Returns the generation it supersedes, if one was
    /// still running.
    pub fn begin(&mut self, generation: u64) -> Option<u64> {
        self.dispatched = self.dispatched.max(generation);
        let superseded = self.in_flight.replace(generation);
        if superseded.is_some() {
            self.discarded += 1;
        }
        superseded
    }

    /// Record a finished compile. Returns whether it is still the newest one.
    pub fn finish(&mut self, generation: u64) -> bool {
        if self.in_flight == Some(generation) {
            self.in_flight = None;
        }
        generation == self.dispatched
    }

    pub fn mark_published(&mut self, generation: u64) {
        self.published = Some(generation);
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn published(&self) -> Option<u64> {
        self.published
    }

    /// Compiles thrown away because a newer edit arrived.
    pub fn discarded(&self) -> u32 {
        self.discarded
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// One compile the scene currently shows.
#[derive(Debug, Clone)]
pub struct PublishedBuild {
    pub generation: u64,
    pub snapshot: FacadeSnapshot,
    pub output: Arc<CompileOutput>,
}

/// The facade the scene shows. Only ever replaced whole.
#[derive(Resource, Debug, Default)]
pub struct PublishedFacade {
    pub current: Option<PublishedBuild>,
}

impl PublishedFacade {
    pub fn generation(&self) -> Option<u64> {
        self.current.as_ref().map(|build| build.generation)
    }
}

/// Problems from the latest compile.
#[derive(Resource, Debug, Default)]
pub struct FacadeDiagnostics {
    /// Set when the newest edit was rejected; the previous facade stays up.
    pub blocking: Option<FacadeError>,
    /// Recovered problems of the published compile.
    pub recovered: Vec<FacadeError>,
}

type CompileResult = Result<CompileOutput, FacadeError>;

struct RunningRebuild {
    generation: u64,
    snapshot: FacadeSnapshot,
    task: Task<CompileResult>,
}

enum Outcome {
    /// The building was removed from the source.
    Cleared,
    Compiled(FacadeSnapshot, CompileResult),
}

struct FinishedRebuild {
    generation: u64,
    outcome: Outcome,
}

/// Rebuild state shared by the dispatch and collect systems.
#[derive(Resource, Default)]
pub struct RebuildQueue {
    pub tracker: RebuildTracker,
    running: Option<RunningRebuild>,
    finished: Option<FinishedRebuild>,
}

impl RebuildQueue {
    pub fn is_idle(&self) -> bool {
        self.running.is_none() && self.finished.is_none()
    }
}

fn compile_snapshot(snapshot: &FacadeSnapshot) -> CompileResult {
    compile(
        &snapshot.spec,
        &snapshot.placement,
        &snapshot.registry,
        &snapshot.params,
    )
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Start a compile for the newest generation.
pub fn dispatch_rebuilds(source: Res<FacadeSource>, mut queue: ResMut<RebuildQueue>) {
    let generation = source.generation();
    if !queue.tracker.needs_dispatch(generation) {
        return;
    }
    if let Some(superseded) = queue.tracker.begin(generation) {
        debug!("facade rebuild {superseded} superseded by {generation}");
    }

    let Some(snapshot) = source.snapshot() else {
        // Building removed: publish an empty facade.
        queue.running = None;
        queue.finished = Some(FinishedRebuild {
            generation,
            outcome: Outcome::Cleared,
        });
        return;
    };

    // On WASM, compile synchronously (no background threads available)
    if cfg!(target_arch = "wasm32") {
        let result = compile_snapshot(&snapshot);
        queue.running = None;
        queue.finished = Some(FinishedRebuild {
            generation,
            outcome: Outcome::Compiled(snapshot, result),
        });
        return;
    }

    let pool = AsyncComputeTaskPool::get();
    let task_snapshot = snapshot.clone();
    let task = pool.spawn(async move { compile_snapshot(&task_snapshot) });
    // Replacing the running task drops it, which cancels the stale compile.
    queue.running = Some(RunningRebuild {
        generation,
        snapshot,
        task,
    });
}

/// Poll the running compile and publish it if it is still current.
pub fn collect_rebuilds(
    mut queue: ResMut<RebuildQueue>,
    mut published: ResMut<PublishedFacade>,
    mut diagnostics: ResMut<FacadeDiagnostics>,
) {
    if let Some(mut running) = queue.running.take() {
        match block_on(futures_lite::future::poll_once(&mut running.task)) {
            Some(result) => {
                queue.finished = Some(FinishedRebuild {
                    generation: running.generation,
                    outcome: Outcome::Compiled(running.snapshot, result),
                });
            }
            None => {
                queue.running = Some(running);
                return;
            }
        }
    }

    let Some(finished) = queue.finished.take() else {
        return;
    };
    if !queue.tracker.finish(finished.generation) {
        debug!("discarding stale facade rebuild {}", finished.generation);
        return;
    }

    match finished.outcome {
        Outcome::Compiled(snapshot, Ok(output)) => {
            info!(
                "facade generation {} published: {} triangles in {} surface groups",
                finished.generation,
                output.report.triangle_count,
                output.mesh.groups.len()
            );
            diagnostics.blocking = None;
            diagnostics.recovered = output.report.diagnostics.clone();
            queue.tracker.mark_published(finished.generation);
            published.current = Some(PublishedBuild {
                generation: finished.generation,
                snapshot,
                output: Arc::new(output),
            });
        }
        Outcome::Cleared => {
            diagnostics.blocking = None;
            diagnostics.recovered.clear();
            queue.tracker.mark_published(finished.generation);
            published.current = None;
        }
        Outcome::Compiled(_, Err(err)) => {
            error!(
                "facade generation {} rejected, keeping the previous facade: {err}",
                finished.generation
            );
            diagnostics.blocking = Some(err);
        }
    }
}
