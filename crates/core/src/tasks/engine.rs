//! Dependency engine: cycle-safe edge mutation and order resolution.
//!
//! The engine holds no graph state of its own. Every operation lists the
//! current edge set from the [`EdgeStore`], builds a fresh
//! [`DependencyGraph`], and answers from that. Mutations run under the
//! store's [`GraphLock`](crate::store::GraphLock) in write mode; reads take the
//! shared side.

use super::DependencyEdge;
use crate::store::{EdgeStore, TaskStore};
use crate::{Error, ProjectId, Result, TaskId};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use taskmesh_task_graph::{DependencyGraph, ExecutionWaves, TieBreak, ValidationResult};
use tracing::{debug, info, instrument, warn};

/// Default bound on waiting for the graph lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for a [`DependencyEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Ordering of tasks that become ready at the same time.
    pub tie_break: TieBreak,
    /// How long to wait for the graph lock. `None` waits forever.
    pub lock_timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::Ascending,
            lock_timeout: Some(DEFAULT_LOCK_TIMEOUT),
        }
    }
}

/// Result of a successful [`DependencyEngine::add_dependency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddOutcome {
    /// A new edge was written.
    Added,
    /// The edge already existed; nothing changed.
    AlreadyPresent,
}

/// What [`DependencyEngine::delete_project_tasks`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletedTasks {
    /// Deleted tasks in creation order.
    pub tasks: Vec<TaskId>,
    /// Edges removed along with them.
    pub edges: usize,
}

/// Findings of [`DependencyEngine::check_integrity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Structural check of the stored edge set.
    pub graph: ValidationResult,
    /// Edges whose parent or child task no longer exists.
    pub dangling: Vec<DependencyEdge>,
}

impl IntegrityReport {
    /// True when the edge set is acyclic and every edge points at live tasks.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.graph.is_valid && self.dangling.is_empty()
    }
}

/// Adds and removes dependency edges while keeping the graph acyclic, and
/// resolves the order tasks can be worked in.
#[derive(Clone)]
pub struct DependencyEngine {
    tasks: Arc<dyn TaskStore>,
    edges: Arc<dyn EdgeStore>,
    options: EngineOptions,
}

impl std::fmt::Debug for DependencyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DependencyEngine {
    /// Create an engine over separate task and edge stores.
    #[must_use]
    pub fn new(tasks: Arc<dyn TaskStore>, edges: Arc<dyn EdgeStore>) -> Self {
        Self {
            tasks,
            edges,
            options: EngineOptions::default(),
        }
    }

    /// Create an engine over a store that keeps both tasks and edges.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: TaskStore + EdgeStore + 'static,
    {
        Self::new(store.clone(), store)
    }

    /// Replace the engine options.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Record that `dependency_id` must finish before `task_id`.
    ///
    /// Rejects self-loops and any edge that would close a cycle, leaving the
    /// edge set untouched. Adding an edge that already exists is a no-op.
    #[instrument(skip(self), fields(task = %task_id, dependency = %dependency_id))]
    pub async fn add_dependency(
        &self,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> Result<AddOutcome> {
        if task_id == dependency_id {
            warn!("Rejected self-dependency");
            return Err(Error::CircularDependency {
                cycle: vec![task_id.clone(), task_id.clone()],
            });
        }

        let _guard = self
            .edges
            .graph_lock()
            .write(self.options.lock_timeout)
            .await?;
        self.ensure_pair_exists(task_id, dependency_id).await?;

        let graph = self.load_graph().await?;
        if graph.contains_edge(dependency_id, task_id) {
            debug!("Dependency already present");
            return Ok(AddOutcome::AlreadyPresent);
        }
        if let Some(cycle) = graph.would_create_cycle(dependency_id, task_id) {
            warn!(cycle_len = cycle.len(), "Rejected dependency that would close a cycle");
            return Err(Error::CircularDependency { cycle });
        }

        let edge = DependencyEdge::new(dependency_id.clone(), task_id.clone());
        if self.edges.insert(&edge).await? {
            info!(edge = %edge, "Dependency added");
            Ok(AddOutcome::Added)
        } else {
            debug!("Edge store reported an existing edge");
            Ok(AddOutcome::AlreadyPresent)
        }
    }

    /// Remove the edge saying `dependency_id` must finish before `task_id`.
    ///
    /// Returns how many edges were removed; zero is not an error.
    #[instrument(skip(self), fields(task = %task_id, dependency = %dependency_id))]
    pub async fn remove_dependency(&self, task_id: &TaskId, dependency_id: &TaskId) -> Result<usize> {
        let _guard = self
            .edges
            .graph_lock()
            .write(self.options.lock_timeout)
            .await?;
        self.ensure_pair_exists(task_id, dependency_id).await?;

        let edge = DependencyEdge::new(dependency_id.clone(), task_id.clone());
        let removed = self.edges.delete_matching(&edge).await?;
        info!(removed, "Dependency removed");
        Ok(removed)
    }

    /// Delete a task together with every edge touching it.
    ///
    /// Returns the number of edges removed.
    #[instrument(skip(self), fields(task = %task_id))]
    pub async fn delete_task(&self, task_id: &TaskId) -> Result<usize> {
        let _guard = self
            .edges
            .graph_lock()
            .write(self.options.lock_timeout)
            .await?;
        if !self.tasks.exists(task_id).await? {
            return Err(Error::TaskNotFound {
                id: task_id.clone(),
            });
        }

        let removed = self.remove_task_unlocked(task_id).await?;
        info!(edges_removed = removed, "Task deleted");
        Ok(removed)
    }

    /// Delete every task of a project together with the edges touching them.
    ///
    /// Runs under one write lock, so no edge can be added to a task of the
    /// project while its siblings are being removed.
    #[instrument(skip(self), fields(project = %project_id))]
    pub async fn delete_project_tasks(&self, project_id: &ProjectId) -> Result<DeletedTasks> {
        let _guard = self
            .edges
            .graph_lock()
            .write(self.options.lock_timeout)
            .await?;

        let mut deleted = DeletedTasks::default();
        for task in self.tasks.list_by_project(project_id).await? {
            deleted.edges += self.remove_task_unlocked(&task.id).await?;
            deleted.tasks.push(task.id);
        }
        info!(
            tasks = deleted.tasks.len(),
            edges_removed = deleted.edges,
            "Project tasks deleted"
        );
        Ok(deleted)
    }

    async fn remove_task_unlocked(&self, task_id: &TaskId) -> Result<usize> {
        let removed = self.edges.delete_touching(task_id).await?;
        self.tasks.delete(task_id).await?;
        Ok(removed)
    }

    /// Order every task that takes part in at least one dependency so that
    /// each parent comes before its children.
    #[instrument(skip(self))]
    pub async fn resolve_order(&self) -> Result<Vec<TaskId>> {
        let _guard = self
            .edges
            .graph_lock()
            .read(self.options.lock_timeout)
            .await?;
        let graph = self.load_graph().await?;
        let order = graph
            .resolve_order(self.options.tie_break)
            .inspect_err(|e| warn!(error = %e, "Stored dependencies contain a cycle"))?;
        debug!(tasks = order.len(), "Resolved order");
        Ok(order)
    }

    /// Group participating tasks into waves; every task's parents sit in an
    /// earlier wave.
    #[instrument(skip(self))]
    pub async fn execution_waves(&self) -> Result<ExecutionWaves<TaskId>> {
        let _guard = self
            .edges
            .graph_lock()
            .read(self.options.lock_timeout)
            .await?;
        let graph = self.load_graph().await?;
        Ok(graph.execution_waves(self.options.tie_break)?)
    }

    /// Direct dependencies of a task, sorted.
    #[instrument(skip(self), fields(task = %task_id))]
    pub async fn dependencies_of(&self, task_id: &TaskId) -> Result<Vec<TaskId>> {
        let _guard = self
            .edges
            .graph_lock()
            .read(self.options.lock_timeout)
            .await?;
        self.ensure_task_exists(task_id).await?;
        let mut parents = self.edges.parents_of(task_id).await?;
        parents.sort();
        parents.dedup();
        Ok(parents)
    }

    /// Tasks that directly depend on a task, sorted.
    #[instrument(skip(self), fields(task = %task_id))]
    pub async fn dependents_of(&self, task_id: &TaskId) -> Result<Vec<TaskId>> {
        let _guard = self
            .edges
            .graph_lock()
            .read(self.options.lock_timeout)
            .await?;
        self.ensure_task_exists(task_id).await?;
        let mut children = self.edges.children_of(task_id).await?;
        children.sort();
        children.dedup();
        Ok(children)
    }

    /// Every task that must finish before `task_id`, transitively, in
    /// resolved order.
    #[instrument(skip(self), fields(task = %task_id))]
    pub async fn prerequisites_of(&self, task_id: &TaskId) -> Result<Vec<TaskId>> {
        let _guard = self
            .edges
            .graph_lock()
            .read(self.options.lock_timeout)
            .await?;
        self.ensure_task_exists(task_id).await?;

        let graph = self.load_graph().await?;
        if !graph.contains_node(task_id) {
            return Ok(Vec::new());
        }
        let ancestors: HashSet<TaskId> = graph.ancestors(task_id)?.into_iter().collect();
        let order = graph.resolve_order(self.options.tie_break)?;
        Ok(order
            .into_iter()
            .filter(|id| ancestors.contains(id))
            .collect())
    }

    /// Re-check the stored edge set for cycles, self-loops and edges that
    /// point at deleted tasks.
    #[instrument(skip(self))]
    pub async fn check_integrity(&self) -> Result<IntegrityReport> {
        let _guard = self
            .edges
            .graph_lock()
            .read(self.options.lock_timeout)
            .await?;
        let edges = self.edges.list_all().await?;

        let mut dangling = Vec::new();
        for edge in &edges {
            if !self.tasks.exists(&edge.parent_task_id).await?
                || !self.tasks.exists(&edge.task_id).await?
            {
                dangling.push(edge.clone());
            }
        }

        let graph = DependencyGraph::from_edges(edges.into_iter().map(DependencyEdge::into_pair));
        let report = IntegrityReport {
            graph: graph.validate(),
            dangling,
        };
        if report.is_healthy() {
            debug!("Dependency graph is healthy");
        } else {
            warn!(
                graph_errors = report.graph.errors.len(),
                dangling = report.dangling.len(),
                "Dependency graph has integrity problems"
            );
        }
        Ok(report)
    }

    async fn load_graph(&self) -> Result<DependencyGraph<TaskId>> {
        let edges = self.edges.list_all().await?;
        Ok(DependencyGraph::from_edges(
            edges.into_iter().map(DependencyEdge::into_pair),
        ))
    }

    async fn ensure_task_exists(&self, task_id: &TaskId) -> Result<()> {
        if self.tasks.exists(task_id).await? {
            Ok(())
        } else {
            Err(Error::TaskNotFound {
                id: task_id.clone(),
            })
        }
    }

    async fn ensure_pair_exists(&self, task_id: &TaskId, dependency_id: &TaskId) -> Result<()> {
        self.ensure_task_exists(task_id).await?;
        if self.tasks.exists(dependency_id).await? {
            Ok(())
        } else {
            Err(Error::DependencyNotFound {
                id: dependency_id.clone(),
            })
        }
    }
}
