//! Turns an [`EngineConfig`] into a validated [`Dag`]: built-in checks plus
//! configuration overrides and additions.

use std::collections::BTreeMap;

use crate::domain::error::PlanError;
use crate::domain::models::{builtin_task, CheckConfig, Dag, EngineConfig, Task, BUILTIN_CHECK_IDS};

/// Builds a task graph from configuration.
#[derive(Debug, Default)]
pub struct Planner;

impl Planner {
    /// Create a planner.
    pub fn new() -> Self {
        Self
    }

    /// Resolve every built-in check plus every configured override/addition
    /// into a validated [`Dag`].
    ///
    /// A configured check whose id has no built-in default must supply its
    /// own `argv`, or planning fails with [`PlanError::UnconfiguredTask`].
    pub fn plan(&self, config: &EngineConfig) -> Result<Dag, PlanError> {
        let overrides: BTreeMap<&str, &CheckConfig> =
            config.checks.iter().map(|c| (c.id.as_str(), c)).collect();

        let mut ids: Vec<&str> = BUILTIN_CHECK_IDS.to_vec();
        for check in &config.checks {
            if !ids.contains(&check.id.as_str()) {
                ids.push(check.id.as_str());
            }
        }

        let mut dag = Dag::new();
        for id in ids {
            let base = builtin_task(id);
            let override_cfg = overrides.get(id);

            if let Some(cfg) = override_cfg {
                if cfg.disabled {
                    continue;
                }
            }

            let task = match (base, override_cfg) {
                (Some(base), Some(cfg)) => apply_override(base, cfg),
                (Some(base), None) => base,
                (None, Some(cfg)) => {
                    let argv = cfg
                        .argv
                        .clone()
                        .ok_or_else(|| PlanError::UnconfiguredTask(id.to_string()))?;
                    Task {
                        id: id.to_string(),
                        argv,
                        deps: cfg.deps.clone().unwrap_or_default(),
                        input_patterns: cfg.input_patterns.clone().unwrap_or_default(),
                        salt: cfg.salt.clone().unwrap_or_default(),
                        timeout_s: cfg.timeout_s,
                        allow_fail: cfg.allow_fail.unwrap_or(false),
                        resources: cfg.resources.clone().unwrap_or_default(),
                    }
                }
                (None, None) => return Err(PlanError::UnconfiguredTask(id.to_string())),
            };

            dag.add(task)?;
        }

        dag.validate_deps()?;
        dag.toposort()?;
        Ok(dag)
    }
}

fn apply_override(base: Task, cfg: &CheckConfig) -> Task {
    Task {
        id: base.id,
        argv: cfg.argv.clone().unwrap_or(base.argv),
        deps: cfg.deps.clone().unwrap_or(base.deps),
        input_patterns: cfg.input_patterns.clone().unwrap_or(base.input_patterns),
        salt: cfg.salt.clone().unwrap_or(base.salt),
        timeout_s: cfg.timeout_s.or(base.timeout_s),
        allow_fail: cfg.allow_fail.unwrap_or(base.allow_fail),
        resources: cfg.resources.clone().unwrap_or(base.resources),
    }
}
