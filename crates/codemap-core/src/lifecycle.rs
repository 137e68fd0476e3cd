//! Project lifecycle state machine.
//!
//! ```text
//!              begin_import               complete_import(Ok)
//!  NoProject ───────────────▶ Importing ─────────────────────▶ Active
//!      ▲                         │  ▲                            │  │
//!      │     complete_import(Err)│  │ begin_import (re-import)   │  │ begin_clear
//!      │        (back to prior)  ▼  └────────────────────────────┘  ▼
//!      └──────────────────────────────────────────────────────── Clearing
//!                     complete_clear(Ok)          complete_clear(Err) → Active
//! ```
//!
//! The controller only records transitions. The backend calls that happen
//! between a `begin_*` and its `complete_*` are made by the
//! [`Session`](crate::session::Session).

use tracing::{info, warn};

use crate::error::{CodemapError, Result};
use crate::models::{ClearOutcome, IngestStats, Project};

/// Coarse lifecycle state, without the data each state carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NoProject,
    Importing,
    Active,
    Clearing,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LifecycleState::NoProject => "no project",
            LifecycleState::Importing => "importing",
            LifecycleState::Active => "active",
            LifecycleState::Clearing => "clearing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    NoProject,
    /// `prior` is restored if the import fails.
    Importing {
        source_uri: String,
        prior: Option<Project>,
    },
    Active(Project),
    Clearing(Project),
}

/// Tracks the lifecycle state and the active project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLifecycle {
    phase: Phase,
}

impl Default for ProjectLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectLifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::NoProject,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match self.phase {
            Phase::NoProject => LifecycleState::NoProject,
            Phase::Importing { .. } => LifecycleState::Importing,
            Phase::Active(_) => LifecycleState::Active,
            Phase::Clearing(_) => LifecycleState::Clearing,
        }
    }

    /// The active project. `None` outside the Active and Clearing states.
    pub fn project(&self) -> Option<&Project> {
        match &self.phase {
            Phase::Active(p) | Phase::Clearing(p) => Some(p),
            Phase::NoProject | Phase::Importing { .. } => None,
        }
    }

    /// The project that stays active if nothing in flight succeeds: the
    /// prior project while a re-import runs, otherwise [`project`](Self::project).
    pub fn committed_project(&self) -> Option<&Project> {
        match &self.phase {
            Phase::Importing { prior, .. } => prior.as_ref(),
            _ => self.project(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    /// Enter Importing.
    ///
    /// Allowed from NoProject and Active. A second import while one is
    /// running, or while a clear is running, is rejected as busy.
    pub fn begin_import(&mut self, source_uri: &str) -> Result<()> {
        let source_uri = source_uri.trim();
        if source_uri.is_empty() {
            return Err(CodemapError::InvalidInput(
                "source must not be empty".to_string(),
            ));
        }

        let prior = match &self.phase {
            Phase::NoProject => None,
            Phase::Active(p) => Some(p.clone()),
            Phase::Importing { .. } => return Err(CodemapError::Busy("import")),
            Phase::Clearing(_) => return Err(CodemapError::Busy("clear")),
        };

        info!(source = source_uri, "import started");
        self.phase = Phase::Importing {
            source_uri: source_uri.to_string(),
            prior,
        };
        Ok(())
    }

    /// Leave Importing with the backend's answer.
    ///
    /// Success makes the imported project active. Failure restores whatever
    /// was there before the import began and hands the error back.
    pub fn complete_import(&mut self, outcome: Result<IngestStats>) -> Result<Project> {
        let (source_uri, prior) = match std::mem::replace(&mut self.phase, Phase::NoProject) {
            Phase::Importing { source_uri, prior } => (source_uri, prior),
            other => {
                self.phase = other;
                return Err(CodemapError::Import("no import in progress".to_string()));
            }
        };

        let outcome = outcome.and_then(|stats| {
            if stats.project_id.trim().is_empty() {
                Err(CodemapError::Import(
                    "backend returned an empty project id".to_string(),
                ))
            } else {
                Ok(stats)
            }
        });

        match outcome {
            Ok(stats) => {
                info!(project_id = %stats.project_id, "import completed");
                let project = Project {
                    id: stats.project_id,
                    source_uri,
                };
                self.phase = Phase::Active(project.clone());
                Ok(project)
            }
            Err(e) => {
                warn!(error = %e, "import failed, rolling back");
                self.phase = match prior {
                    Some(p) => Phase::Active(p),
                    None => Phase::NoProject,
                };
                Err(e)
            }
        }
    }

    /// Gate a search: the project must be active and the query non-empty.
    ///
    /// The state is checked first, so outside Active every query fails with
    /// [`CodemapError::NoProject`]. Never changes state.
    pub fn authorize_search(&self, query: &str) -> Result<&Project> {
        let Phase::Active(project) = &self.phase else {
            return Err(CodemapError::NoProject);
        };
        if query.trim().is_empty() {
            return Err(CodemapError::InvalidInput(
                "query must not be empty".to_string(),
            ));
        }
        Ok(project)
    }

    /// Enter Clearing. Returns the project being cleared.
    pub fn begin_clear(&mut self) -> Result<Project> {
        let project = match &self.phase {
            Phase::Active(p) => p.clone(),
            _ => return Err(CodemapError::NoProject),
        };
        info!(project_id = %project.id, "clear started");
        self.phase = Phase::Clearing(project.clone());
        Ok(project)
    }

    /// Leave Clearing. Only a confirmed clear discards the project.
    pub fn complete_clear(&mut self, outcome: Result<ClearOutcome>) -> Result<ClearOutcome> {
        let project = match std::mem::replace(&mut self.phase, Phase::NoProject) {
            Phase::Clearing(project) => project,
            other => {
                self.phase = other;
                return Err(CodemapError::Clear("no clear in progress".to_string()));
            }
        };

        match outcome {
            Ok(cleared) => {
                info!(
                    project_id = %project.id,
                    deleted = cleared.deleted_count,
                    "project cleared"
                );
                Ok(cleared)
            }
            Err(e) => {
                warn!(project_id = %project.id, error = %e, "clear failed, project kept");
                self.phase = Phase::Active(project);
                Err(e)
            }
        }
    }
}
