//! Task dependency graph: construction, cycle detection, topological sort,
//! and the transitive-dependents projection used for changed-only runs.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::task::Task;
use crate::domain::error::PlanError;

/// A task dependency graph keyed by [`Task::id`].
///
/// Iteration order (`toposort`) is deterministic: ties between tasks whose
/// dependencies are simultaneously satisfied are broken lexicographically
/// by task id, so the same task set always dispatches in the same order.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    tasks: BTreeMap<String, Task>,
}

impl Dag {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task, rejecting duplicate ids.
    pub fn add(&mut self, task: Task) -> Result<(), PlanError> {
        if self.tasks.contains_key(&task.id) {
            return Err(PlanError::DuplicateTaskId(task.id));
        }
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Look up a task by id.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// All tasks, in insertion-independent (id-sorted) order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Validate that every declared dependency exists in the graph.
    pub fn validate_deps(&self) -> Result<(), PlanError> {
        for task in self.tasks.values() {
            for dep in &task.deps {
                if !self.tasks.contains_key(dep) {
                    return Err(PlanError::UnknownDep {
                        task: task.id.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn dependents(&self) -> HashMap<&str, BTreeSet<&str>> {
        let mut dependents: HashMap<&str, BTreeSet<&str>> =
            self.tasks.keys().map(|id| (id.as_str(), BTreeSet::new())).collect();
        for task in self.tasks.values() {
            for dep in &task.deps {
                dependents.entry(dep.as_str()).or_default().insert(task.id.as_str());
            }
        }
        dependents
    }

    /// Kahn's algorithm with a lexicographic tie-break on task id: the
    /// ready queue is always drained in sorted order, so the dispatch
    /// order is a pure function of the task set, never of insertion order.
    pub fn toposort(&self) -> Result<Vec<String>, PlanError> {
        self.validate_deps()?;

        let dependents = self.dependents();
        let mut in_degree: HashMap<&str, usize> = self
            .tasks
            .values()
            .map(|t| (t.id.as_str(), t.deps.len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(&id) = ready.iter().next() {
            ready.remove(id);
            order.push(id.to_string());
            if let Some(deps) = dependents.get(id) {
                for &dependent in deps {
                    let degree = in_degree.get_mut(dependent).expect("known task");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() != self.tasks.len() {
            let stuck = self
                .tasks
                .keys()
                .find(|id| !order.contains(id))
                .cloned()
                .unwrap_or_default();
            return Err(PlanError::Cycle(stuck));
        }

        Ok(order)
    }

    /// All ids transitively reachable as dependents of `seed_ids`, plus the
    /// seeds themselves, in topological order. Used to scope a changed-only
    /// run to the seeds and everything downstream of them.
    pub fn minimal_subgraph(&self, seed_ids: &[String]) -> Result<Vec<String>, PlanError> {
        let order = self.toposort()?;
        let dependents = self.dependents();

        let mut include: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for seed in seed_ids {
            if self.tasks.contains_key(seed) && include.insert(seed.as_str()) {
                queue.push_back(seed.as_str());
            }
        }
        while let Some(id) = queue.pop_front() {
            if let Some(deps) = dependents.get(id) {
                for &dependent in deps {
                    if include.insert(dependent) {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        Ok(order.into_iter().filter(|id| include.contains(id.as_str())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            argv: vec!["true".to_string()],
            deps: deps.iter().map(|s| s.to_string()).collect(),
            input_patterns: vec![],
            salt: String::new(),
            timeout_s: None,
            allow_fail: false,
            resources: vec![],
        }
    }

    #[test]
    fn toposort_respects_dependencies() {
        let mut dag = Dag::new();
        dag.add(task("a", &[])).unwrap();
        dag.add(task("b", &["a"])).unwrap();
        dag.add(task("c", &["b"])).unwrap();
        let order = dag.toposort().unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn toposort_is_lexicographic_among_ready_tasks() {
        let mut dag = Dag::new();
        dag.add(task("zeta", &[])).unwrap();
        dag.add(task("alpha", &[])).unwrap();
        dag.add(task("mu", &[])).unwrap();
        assert_eq!(dag.toposort().unwrap(), vec!["alpha", "mu", "zeta"]);
    }

    #[test]
    fn detects_cycle() {
        let mut dag = Dag::new();
        dag.add(task("a", &["b"])).unwrap();
        dag.add(task("b", &["a"])).unwrap();
        assert!(matches!(dag.toposort(), Err(PlanError::Cycle(_))));
    }

    #[test]
    fn rejects_duplicate_id() {
        let mut dag = Dag::new();
        dag.add(task("a", &[])).unwrap();
        assert!(matches!(
            dag.add(task("a", &[])),
            Err(PlanError::DuplicateTaskId(_))
        ));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let mut dag = Dag::new();
        dag.add(task("a", &["ghost"])).unwrap();
        assert!(matches!(dag.toposort(), Err(PlanError::UnknownDep { .. })));
    }

    #[test]
    fn minimal_subgraph_includes_seed_and_transitive_dependents_only() {
        let mut dag = Dag::new();
        dag.add(task("a", &[])).unwrap();
        dag.add(task("b", &["a"])).unwrap();
        dag.add(task("c", &["b"])).unwrap();
        dag.add(task("unrelated", &[])).unwrap();

        let subset = dag.minimal_subgraph(&["a".to_string()]).unwrap();
        assert_eq!(subset, vec!["a", "b", "c"]);
    }
}
