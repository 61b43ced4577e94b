//! Authentication flow tree.
//!
//! A flow is a tree of executions. Each execution points at its parent flow;
//! a sub-flow step additionally points at the flow it runs. [`FlowTree`]
//! keeps the executions in an arena keyed by id and derives the ordered
//! children of every parent, so the login engine can walk the tree without
//! going back to storage.

use std::collections::{HashMap, HashSet};

use kc_model::AuthenticationExecution;
use uuid::Uuid;

use crate::error::{FlowError, FlowResult};

/// An arena of executions with derived, ordered child lists.
#[derive(Debug, Clone, Default)]
pub struct FlowTree {
    /// Parent of the root level (`None` for parentless steps).
    top: Option<Uuid>,
    nodes: HashMap<Uuid, AuthenticationExecution>,
    children: HashMap<Option<Uuid>, Vec<Uuid>>,
}

impl FlowTree {
    /// Builds a tree whose root level is the children of `top`.
    #[must_use]
    pub fn new(
        top: Option<Uuid>,
        executions: impl IntoIterator<Item = AuthenticationExecution>,
    ) -> Self {
        let nodes: HashMap<Uuid, AuthenticationExecution> =
            executions.into_iter().map(|e| (e.id, e)).collect();

        let mut children: HashMap<Option<Uuid>, Vec<Uuid>> = HashMap::new();
        for execution in nodes.values() {
            children
                .entry(execution.parent_flow)
                .or_default()
                .push(execution.id);
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|id| nodes[id].ordering_key());
        }

        Self {
            top,
            nodes,
            children,
        }
    }

    /// The flow whose steps form the root level.
    #[must_use]
    pub const fn top(&self) -> Option<Uuid> {
        self.top
    }

    /// Number of executions in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds no executions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gets an execution by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&AuthenticationExecution> {
        self.nodes.get(&id)
    }

    /// Root-level executions, in execution order.
    #[must_use]
    pub fn roots(&self) -> Vec<&AuthenticationExecution> {
        self.siblings(self.top)
    }

    /// Steps of a flow, in execution order.
    #[must_use]
    pub fn children(&self, flow_id: Uuid) -> Vec<&AuthenticationExecution> {
        self.siblings(Some(flow_id))
    }

    /// Steps of the flow a sub-flow step runs.
    ///
    /// Returns `None` if `execution_id` is unknown or not a sub-flow step.
    #[must_use]
    pub fn sub_flow_children(&self, execution_id: Uuid) -> Option<Vec<&AuthenticationExecution>> {
        let flow_id = self.get(execution_id)?.sub_flow_id()?;
        Some(self.children(flow_id))
    }

    /// Groups the steps of a flow by requirement.
    #[must_use]
    pub fn group(&self, flow_id: Uuid) -> SiblingGroup<'_> {
        SiblingGroup::from_siblings(self.children(flow_id))
    }

    /// Groups the root-level steps by requirement.
    #[must_use]
    pub fn root_group(&self) -> SiblingGroup<'_> {
        SiblingGroup::from_siblings(self.roots())
    }

    /// Depth-first, pre-order walk from the root level.
    ///
    /// Each entry carries its depth (0 for root-level steps). Sub-flow steps
    /// are followed by the steps of the flow they run. A flow already on the
    /// current path is not entered twice.
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, &AuthenticationExecution)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut path = HashSet::new();
        if let Some(top) = self.top {
            path.insert(top);
        }
        self.walk_level(self.top, 0, &mut path, &mut out);
        out
    }

    fn walk_level<'a>(
        &'a self,
        parent: Option<Uuid>,
        depth: usize,
        path: &mut HashSet<Uuid>,
        out: &mut Vec<(usize, &'a AuthenticationExecution)>,
    ) {
        for execution in self.siblings(parent) {
            out.push((depth, execution));
            if let Some(flow_id) = execution.sub_flow_id()
                && path.insert(flow_id)
            {
                self.walk_level(Some(flow_id), depth + 1, path, out);
                path.remove(&flow_id);
            }
        }
    }

    /// Checks every execution and rejects sub-flow cycles.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidExecution` for a malformed execution, and
    /// `FlowError::Cycle` naming a flow that reaches itself through
    /// sub-flow steps.
    pub fn validate(&self) -> FlowResult<()> {
        for execution in self.nodes.values() {
            execution.validate()?;
        }

        // Edges run from a parent flow to every flow its steps run.
        let mut edges: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for execution in self.nodes.values() {
            if let (Some(parent), Some(sub)) = (execution.parent_flow, execution.sub_flow_id()) {
                edges.entry(parent).or_default().push(sub);
            }
        }

        let mut done = HashSet::new();
        for &start in edges.keys() {
            if done.contains(&start) {
                continue;
            }
            let mut on_path = HashSet::new();
            Self::visit(start, &edges, &mut on_path, &mut done)?;
        }
        Ok(())
    }

    fn visit(
        flow: Uuid,
        edges: &HashMap<Uuid, Vec<Uuid>>,
        on_path: &mut HashSet<Uuid>,
        done: &mut HashSet<Uuid>,
    ) -> FlowResult<()> {
        if done.contains(&flow) {
            return Ok(());
        }
        if !on_path.insert(flow) {
            return Err(FlowError::Cycle(flow));
        }
        for &next in edges.get(&flow).into_iter().flatten() {
            Self::visit(next, edges, on_path, done)?;
        }
        on_path.remove(&flow);
        done.insert(flow);
        Ok(())
    }

    fn siblings(&self, parent: Option<Uuid>) -> Vec<&AuthenticationExecution> {
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }
}

/// Steps sharing one parent, split by requirement.
///
/// Each list keeps execution order.
#[derive(Debug, Clone, Default)]
pub struct SiblingGroup<'a> {
    /// Steps that must succeed.
    pub required: Vec<&'a AuthenticationExecution>,
    /// Steps of which one must succeed when nothing is required.
    pub alternatives: Vec<&'a AuthenticationExecution>,
    /// Steps attempted only if configured for the user.
    pub optional: Vec<&'a AuthenticationExecution>,
    /// Steps that are skipped.
    pub disabled: Vec<&'a AuthenticationExecution>,
}

impl<'a> SiblingGroup<'a> {
    /// Splits an ordered sibling list.
    #[must_use]
    pub fn from_siblings(siblings: impl IntoIterator<Item = &'a AuthenticationExecution>) -> Self {
        let mut group = Self::default();
        for execution in siblings {
            if execution.is_required() {
                group.required.push(execution);
            } else if execution.is_alternative() {
                group.alternatives.push(execution);
            } else if execution.is_optional() {
                group.optional.push(execution);
            } else {
                group.disabled.push(execution);
            }
        }
        group
    }

    /// Whether at least one alternative must succeed.
    ///
    /// Alternatives are ignored when a required sibling exists.
    #[must_use]
    pub fn alternatives_apply(&self) -> bool {
        self.required.is_empty() && !self.alternatives.is_empty()
    }

    /// Steps the engine will attempt, in execution order.
    #[must_use]
    pub fn enabled(&self) -> Vec<&'a AuthenticationExecution> {
        let mut steps: Vec<&AuthenticationExecution> = self
            .required
            .iter()
            .chain(&self.alternatives)
            .chain(&self.optional)
            .copied()
            .collect();
        steps.sort_by_key(|e| e.ordering_key());
        steps
    }
}
