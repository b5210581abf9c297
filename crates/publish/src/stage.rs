use std::fmt;

/// Where a publish run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Loading,
    Transforming,
    Rendering,
    Writing,
    Deploying,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Stages only move forward; `Deploying` may be skipped and any running
    /// stage may fail.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        match (self, next) {
            (current, Failed) => !current.is_terminal(),
            (Idle, Loading)
            | (Loading, Transforming)
            | (Transforming, Rendering)
            | (Rendering, Writing)
            | (Writing, Deploying)
            | (Writing, Done)
            | (Deploying, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "Idle",
            Stage::Loading => "Loading",
            Stage::Transforming => "Transforming",
            Stage::Rendering => "Rendering",
            Stage::Writing => "Writing",
            Stage::Deploying => "Deploying",
            Stage::Done => "Done",
            Stage::Failed => "Failed",
        };
        f.write_str(name)
    }
}
