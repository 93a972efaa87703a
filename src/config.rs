//! Engine configuration

/// Knobs for the join planner and executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Allow multi-table SELECTs whose join conditions leave tables unconnected
    pub allow_cartesian: bool,
    /// Pass index key bounds of placed tables to pending tables' fetches
    pub propagate_hints: bool,
    /// Evaluate AND-path leaves as soon as all their tables are bound
    pub incremental_pruning: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_cartesian: false,
            propagate_hints: true,
            incremental_pruning: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_cartesian(mut self, allow: bool) -> Self {
        self.allow_cartesian = allow;
        self
    }

    pub fn with_propagate_hints(mut self, propagate: bool) -> Self {
        self.propagate_hints = propagate;
        self
    }

    pub fn with_incremental_pruning(mut self, enabled: bool) -> Self {
        self.incremental_pruning = enabled;
        self
    }
}
