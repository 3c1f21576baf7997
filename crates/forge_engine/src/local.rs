//! In-memory reference engine.
//!
//! [`LocalEngine`] keeps the declared graph in memory, settles pending
//! outputs as resources are provisioned and diffs every resource against a
//! prior [`StateSnapshot`], so a second run over the same program is a no-op.
//!
//! Ordering comes entirely from data: a resource's provisioning future awaits
//! its input outputs, which only settle once the producing resource is done.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::future;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::engine::ResourceEngine;
use crate::error::{EngineError, EngineResult, OutputError};
use crate::output::{Output, OutputResolver};
use crate::provider::{ProvisionedResource, Provisioner};
use crate::resource::{PropertyMap, RegisteredResource, ResourceOptions, ResourceStatus};
use crate::state::{ResourceSnapshot, StateSnapshot};
use crate::urn::{validate_type_token, Urn};

/// What apply did to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOp {
    Create,
    Update,
    /// Deleted and created again because an input could not change in place.
    Replace,
    Same,
    Delete,
}

impl StepOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepOp::Create => "create",
            StepOp::Update => "update",
            StepOp::Replace => "replace",
            StepOp::Same => "same",
            StepOp::Delete => "delete",
        }
    }
}

impl fmt::Display for StepOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub urn: Urn,
    pub op: StepOp,
}

/// A resource that could not be provisioned, with its owner for context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningFailure {
    pub urn: Urn,
    pub parent: Option<Urn>,
    pub message: String,
}

impl fmt::Display for ProvisioningFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(
                f,
                "{} (child of {}) failed: {}",
                self.urn.name(),
                parent.name(),
                self.message
            ),
            None => write!(f, "{} failed: {}", self.urn.name(), self.message),
        }
    }
}

/// Result of one apply pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplySummary {
    pub steps: Vec<StepRecord>,
    pub failures: Vec<ProvisioningFailure>,
}

impl ApplySummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn count(&self, op: StepOp) -> usize {
        self.steps.iter().filter(|s| s.op == op).count()
    }

    /// Whether anything other than `same` happened.
    pub fn has_changes(&self) -> bool {
        self.steps.iter().any(|s| s.op != StepOp::Same)
    }

    pub fn step_for(&self, urn: &Urn) -> Option<StepOp> {
        self.steps.iter().find(|s| &s.urn == urn).map(|s| s.op)
    }
}

/// Read-only view of a declared resource, for graph inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredResource {
    pub urn: Urn,
    pub type_token: String,
    pub parent: Option<Urn>,
    pub is_component: bool,
    /// Every resource this one waits on.
    pub dependencies: BTreeSet<Urn>,
    /// Resources each input property was derived from.
    pub property_dependencies: BTreeMap<String, BTreeSet<Urn>>,
    pub outputs_registered: bool,
}

struct Resolvers {
    id: OutputResolver<String>,
    state: OutputResolver<Map<String, Value>>,
}

impl Resolvers {
    fn fail(self, error: OutputError) {
        self.id.fail(error.clone());
        self.state.fail(error);
    }
}

enum NodeKind {
    Component {
        outputs: Option<PropertyMap>,
    },
    Custom {
        inputs: PropertyMap,
        id: Output<String>,
        waits: Vec<Output<String>>,
        resolvers: Option<Resolvers>,
    },
}

struct Node {
    urn: Urn,
    type_token: String,
    name: String,
    parent: Option<Urn>,
    protect: bool,
    dependencies: BTreeSet<Urn>,
    status: ResourceStatus,
    kind: NodeKind,
}

impl Node {
    fn declared(&self) -> DeclaredResource {
        let (is_component, property_dependencies, outputs_registered) = match &self.kind {
            NodeKind::Component { outputs } => (true, BTreeMap::new(), outputs.is_some()),
            NodeKind::Custom { inputs, .. } => (false, inputs.property_dependencies(), false),
        };
        DeclaredResource {
            urn: self.urn.clone(),
            type_token: self.type_token.clone(),
            parent: self.parent.clone(),
            is_component,
            dependencies: self.dependencies.clone(),
            property_dependencies,
            outputs_registered,
        }
    }
}

#[derive(Default)]
struct Graph {
    nodes: Vec<Node>,
    index: HashMap<Urn, usize>,
    snapshots: HashMap<Urn, ResourceSnapshot>,
    deleted: HashSet<Urn>,
}

impl Graph {
    fn get(&self, urn: &Urn) -> Option<&Node> {
        self.index.get(urn).map(|&i| &self.nodes[i])
    }

    fn check_new(&self, urn: &Urn, parent: Option<&Urn>) -> EngineResult<()> {
        if self.index.contains_key(urn) {
            return Err(EngineError::DuplicateUrn(urn.clone()));
        }
        if let Some(parent) = parent {
            if !self.index.contains_key(parent) {
                return Err(EngineError::UnknownParent(parent.clone()));
            }
        }
        Ok(())
    }

    fn push(&mut self, node: Node) {
        self.index.insert(node.urn.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    fn is_descendant(&self, node: &Node, ancestor: &Urn) -> bool {
        let mut parent = node.parent.as_ref();
        while let Some(urn) = parent {
            if urn == ancestor {
                return true;
            }
            parent = self.get(urn).and_then(|n| n.parent.as_ref());
        }
        false
    }

    /// Custom resources under `urn`, at any depth.
    fn custom_descendants(&self, urn: &Urn) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Custom { .. }) && self.is_descendant(n, urn))
            .collect()
    }

    /// Outputs that settle once `urn` (and, for components, everything under
    /// it) has been provisioned.
    fn completion_of(&self, urn: &Urn) -> EngineResult<Vec<Output<String>>> {
        let node = self
            .get(urn)
            .ok_or_else(|| EngineError::UnknownResource(urn.clone()))?;
        let ids = match &node.kind {
            NodeKind::Custom { id, .. } => vec![id.clone()],
            NodeKind::Component { .. } => self
                .custom_descendants(urn)
                .into_iter()
                .filter_map(|n| match &n.kind {
                    NodeKind::Custom { id, .. } => Some(id.clone()),
                    NodeKind::Component { .. } => None,
                })
                .collect(),
        };
        Ok(ids)
    }

    fn set_status(&mut self, urn: &Urn, status: ResourceStatus) {
        if let Some(&i) = self.index.get(urn) {
            self.nodes[i].status = status;
        }
    }

    fn aggregate_status(&self, urn: &Urn) -> Option<ResourceStatus> {
        let node = self.get(urn)?;
        let outputs_registered = match &node.kind {
            NodeKind::Custom { .. } => return Some(node.status),
            NodeKind::Component { outputs } => outputs.is_some(),
        };

        let statuses: Vec<ResourceStatus> = self
            .custom_descendants(urn)
            .iter()
            .map(|n| n.status)
            .collect();

        let status = if statuses.contains(&ResourceStatus::Failed) {
            ResourceStatus::Failed
        } else if statuses.is_empty() {
            if outputs_registered {
                ResourceStatus::Ready
            } else {
                ResourceStatus::Pending
            }
        } else if statuses.iter().all(|s| *s == ResourceStatus::Ready) && outputs_registered {
            ResourceStatus::Ready
        } else if statuses.iter().any(|s| *s != ResourceStatus::Pending) {
            ResourceStatus::Provisioning
        } else {
            ResourceStatus::Pending
        };
        Some(status)
    }
}

struct Work {
    urn: Urn,
    type_token: String,
    name: String,
    parent: Option<Urn>,
    protect: bool,
    inputs: PropertyMap,
    waits: Vec<Output<String>>,
    resolvers: Resolvers,
    prior: Option<ResourceSnapshot>,
}

struct Outcome {
    step: Option<StepRecord>,
    failure: Option<ProvisioningFailure>,
    snapshot: Option<ResourceSnapshot>,
}

/// In-memory engine backed by a [`Provisioner`].
pub struct LocalEngine {
    stack: String,
    project: String,
    provisioner: Arc<dyn Provisioner>,
    prior: StateSnapshot,
    graph: RwLock<Graph>,
}

impl LocalEngine {
    pub fn new(
        stack: impl Into<String>,
        project: impl Into<String>,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        Self {
            stack: stack.into(),
            project: project.into(),
            provisioner,
            prior: StateSnapshot::new(),
            graph: RwLock::new(Graph::default()),
        }
    }

    /// Diff against a previously converged state.
    pub fn with_state(mut self, prior: StateSnapshot) -> Self {
        self.prior = prior;
        self
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Inspect a declared resource.
    pub fn declared(&self, urn: &Urn) -> Option<DeclaredResource> {
        self.graph.read().get(urn).map(Node::declared)
    }

    /// Every declared resource in registration order.
    pub fn declared_resources(&self) -> Vec<DeclaredResource> {
        self.graph.read().nodes.iter().map(Node::declared).collect()
    }

    /// Direct children of a resource.
    pub fn children_of(&self, urn: &Urn) -> Vec<Urn> {
        self.graph
            .read()
            .nodes
            .iter()
            .filter(|n| n.parent.as_ref() == Some(urn))
            .map(|n| n.urn.clone())
            .collect()
    }

    /// Outputs a component registered, if it has.
    pub fn component_outputs(&self, urn: &Urn) -> Option<PropertyMap> {
        match &self.graph.read().get(urn)?.kind {
            NodeKind::Component { outputs } => outputs.clone(),
            NodeKind::Custom { .. } => None,
        }
    }

    /// Provision everything declared since the last apply and delete prior
    /// resources that are no longer declared.
    pub async fn apply(&self) -> ApplySummary {
        let work = self.take_work();
        info!("Applying {} resources", work.len());

        let outcomes = future::join_all(work.into_iter().map(|w| self.provision(w))).await;

        let mut summary = ApplySummary::default();
        {
            let mut graph = self.graph.write();
            for outcome in outcomes {
                if let Some(snapshot) = outcome.snapshot {
                    graph.snapshots.insert(snapshot.urn.clone(), snapshot);
                }
                summary.steps.extend(outcome.step);
                summary.failures.extend(outcome.failure);
            }
        }

        self.delete_undeclared(&mut summary).await;

        info!(
            "Apply finished: {} created, {} updated, {} replaced, {} unchanged, {} deleted, \
             {} failed",
            summary.count(StepOp::Create),
            summary.count(StepOp::Update),
            summary.count(StepOp::Replace),
            summary.count(StepOp::Same),
            summary.count(StepOp::Delete),
            summary.failures.len()
        );
        summary
    }

    /// State after the last apply, in registration order.
    pub fn snapshot(&self) -> StateSnapshot {
        let graph = self.graph.read();
        let mut resources = Vec::new();

        for node in &graph.nodes {
            match &node.kind {
                NodeKind::Component { .. } => resources.push(ResourceSnapshot {
                    urn: node.urn.clone(),
                    type_token: node.type_token.clone(),
                    id: None,
                    parent: node.parent.clone(),
                    inputs: Map::new(),
                    outputs: Map::new(),
                    protect: node.protect,
                }),
                NodeKind::Custom { .. } => {
                    if let Some(snapshot) = graph.snapshots.get(&node.urn) {
                        resources.push(snapshot.clone());
                    }
                }
            }
        }

        // Prior resources that are no longer declared but could not be deleted.
        for prior in &self.prior.resources {
            if !graph.index.contains_key(&prior.urn) && !graph.deleted.contains(&prior.urn) {
                resources.push(prior.clone());
            }
        }

        StateSnapshot {
            updated_at: Some(Utc::now()),
            resources,
        }
    }

    fn take_work(&self) -> Vec<Work> {
        let mut graph = self.graph.write();
        let mut work = Vec::new();

        for node in graph.nodes.iter_mut() {
            let Node {
                urn,
                type_token,
                name,
                parent,
                protect,
                status,
                kind,
                ..
            } = node;

            if let NodeKind::Custom {
                inputs,
                waits,
                resolvers,
                ..
            } = kind
            {
                if let Some(resolvers) = resolvers.take() {
                    *status = ResourceStatus::Provisioning;
                    work.push(Work {
                        urn: urn.clone(),
                        type_token: type_token.clone(),
                        name: name.clone(),
                        parent: parent.clone(),
                        protect: *protect,
                        inputs: inputs.clone(),
                        waits: waits.clone(),
                        resolvers,
                        prior: self.prior.get(urn).cloned(),
                    });
                }
            }
        }
        work
    }

    async fn provision(&self, work: Work) -> Outcome {
        let Work {
            urn,
            type_token,
            name,
            parent,
            protect,
            inputs,
            waits,
            resolvers,
            prior,
        } = work;

        for wait in &waits {
            if let Err(cause) = wait.resolve().await {
                return self.skip(urn, parent, resolvers, prior, cause);
            }
        }
        let inputs = match inputs.resolve_all().await {
            Ok(inputs) => inputs,
            Err(cause) => return self.skip(urn, parent, resolvers, prior, cause),
        };

        debug!("Inputs of {} resolved", urn);

        let prior_id = prior
            .as_ref()
            .filter(|p| p.type_token == type_token)
            .and_then(|p| p.id.clone());

        // `kept` records whether the previously provisioned resource still
        // exists if this step fails.
        let (op, result, kept) = match (&prior, prior_id) {
            (Some(p), Some(id)) if p.inputs == inputs => (
                StepOp::Same,
                Ok(ProvisionedResource {
                    id,
                    outputs: p.outputs.clone(),
                }),
                true,
            ),
            (Some(p), Some(id)) => match self.provisioner.update(&type_token, &id, &inputs).await {
                Err(EngineError::ReplaceRequired(reason)) => {
                    info!("{} must be replaced: {}", urn, reason);
                    self.replace(&type_token, &name, &id, &inputs, p.protect || protect)
                        .await
                }
                result => (StepOp::Update, result, true),
            },
            _ => (
                StepOp::Create,
                self.provisioner.create(&type_token, &name, &inputs).await,
                false,
            ),
        };

        match result {
            Ok(provisioned) => {
                let mut state = inputs.clone();
                for (key, value) in &provisioned.outputs {
                    state.insert(key.clone(), value.clone());
                }
                resolvers.id.resolve(provisioned.id.clone());
                resolvers.state.resolve(state);
                self.graph.write().set_status(&urn, ResourceStatus::Ready);

                if op == StepOp::Same {
                    debug!("{} unchanged", urn);
                } else {
                    info!("{} {}", op, urn);
                }

                Outcome {
                    step: Some(StepRecord {
                        urn: urn.clone(),
                        op,
                    }),
                    failure: None,
                    snapshot: Some(ResourceSnapshot {
                        urn,
                        type_token,
                        id: Some(provisioned.id),
                        parent,
                        inputs,
                        outputs: provisioned.outputs,
                        protect,
                    }),
                }
            }
            Err(err) => {
                let message = err.to_string();
                warn!("{} of {} failed: {}", op, urn, message);
                resolvers.fail(OutputError::Failed {
                    urn: urn.clone(),
                    message: message.clone(),
                });
                self.graph.write().set_status(&urn, ResourceStatus::Failed);

                Outcome {
                    step: None,
                    failure: Some(ProvisioningFailure {
                        urn,
                        parent,
                        message,
                    }),
                    snapshot: prior.filter(|_| kept),
                }
            }
        }
    }

    /// Delete the resource behind `id` and create it again from `inputs`.
    async fn replace(
        &self,
        type_token: &str,
        name: &str,
        id: &str,
        inputs: &Map<String, Value>,
        protect: bool,
    ) -> (StepOp, EngineResult<ProvisionedResource>, bool) {
        if protect {
            let err = EngineError::Provider(format!(
                "{} is protected and cannot be replaced",
                id
            ));
            return (StepOp::Replace, Err(err), true);
        }
        if let Err(err) = self.provisioner.delete(type_token, id).await {
            return (StepOp::Replace, Err(err), true);
        }
        let result = self.provisioner.create(type_token, name, inputs).await;
        (StepOp::Replace, result, false)
    }

    fn skip(
        &self,
        urn: Urn,
        parent: Option<Urn>,
        resolvers: Resolvers,
        prior: Option<ResourceSnapshot>,
        cause: OutputError,
    ) -> Outcome {
        let dependency = cause.origin().cloned().unwrap_or_else(|| urn.clone());
        warn!("Skipping {}: {}", urn, cause);

        resolvers.fail(OutputError::DependencyFailed {
            urn: urn.clone(),
            dependency,
        });
        self.graph.write().set_status(&urn, ResourceStatus::Failed);

        Outcome {
            step: None,
            failure: Some(ProvisioningFailure {
                urn,
                parent,
                message: cause.to_string(),
            }),
            snapshot: prior,
        }
    }

    async fn delete_undeclared(&self, summary: &mut ApplySummary) {
        let doomed: Vec<ResourceSnapshot> = {
            let graph = self.graph.read();
            self.prior
                .resources
                .iter()
                .rev()
                .filter(|r| !graph.index.contains_key(&r.urn) && !graph.deleted.contains(&r.urn))
                .cloned()
                .collect()
        };

        for resource in doomed {
            if resource.protect {
                warn!("Refusing to delete protected resource {}", resource.urn);
                summary.failures.push(ProvisioningFailure {
                    urn: resource.urn.clone(),
                    parent: resource.parent.clone(),
                    message: "resource is protected".to_string(),
                });
                continue;
            }

            let result = match &resource.id {
                Some(id) => self.provisioner.delete(&resource.type_token, id).await,
                None => Ok(()),
            };

            match result {
                Ok(()) => {
                    info!("delete {}", resource.urn);
                    self.graph.write().deleted.insert(resource.urn.clone());
                    summary.steps.push(StepRecord {
                        urn: resource.urn,
                        op: StepOp::Delete,
                    });
                }
                Err(err) => {
                    warn!("delete of {} failed: {}", resource.urn, err);
                    summary.failures.push(ProvisioningFailure {
                        urn: resource.urn,
                        parent: resource.parent,
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

impl ResourceEngine for LocalEngine {
    fn register_component(
        &self,
        type_token: &str,
        name: &str,
        opts: &ResourceOptions,
    ) -> EngineResult<Urn> {
        validate_type_token(type_token)?;
        let urn = Urn::new(&self.stack, &self.project, opts.parent.as_ref(), type_token, name);

        let mut graph = self.graph.write();
        graph.check_new(&urn, opts.parent.as_ref())?;
        for dep in &opts.depends_on {
            if graph.get(dep).is_none() {
                return Err(EngineError::UnknownResource(dep.clone()));
            }
        }

        debug!("Registering component {}", urn);
        graph.push(Node {
            urn: urn.clone(),
            type_token: type_token.to_string(),
            name: name.to_string(),
            parent: opts.parent.clone(),
            protect: opts.protect,
            dependencies: opts.depends_on.iter().cloned().collect(),
            status: ResourceStatus::Pending,
            kind: NodeKind::Component { outputs: None },
        });
        Ok(urn)
    }

    fn register_resource(
        &self,
        type_token: &str,
        name: &str,
        props: PropertyMap,
        opts: &ResourceOptions,
    ) -> EngineResult<RegisteredResource> {
        validate_type_token(type_token)?;
        let urn = Urn::new(&self.stack, &self.project, opts.parent.as_ref(), type_token, name);

        let mut graph = self.graph.write();
        graph.check_new(&urn, opts.parent.as_ref())?;

        let mut waits = Vec::new();
        for dep in &opts.depends_on {
            waits.extend(graph.completion_of(dep)?);
        }

        let mut dependencies = props.dependencies();
        dependencies.extend(opts.depends_on.iter().cloned());

        let (id_resolver, id) = Output::pending(urn.clone());
        let (state_resolver, state) = Output::pending(urn.clone());

        debug!("Registering resource {} ({} inputs)", urn, props.len());
        graph.push(Node {
            urn: urn.clone(),
            type_token: type_token.to_string(),
            name: name.to_string(),
            parent: opts.parent.clone(),
            protect: opts.protect,
            dependencies,
            status: ResourceStatus::Pending,
            kind: NodeKind::Custom {
                inputs: props,
                id: id.clone(),
                waits,
                resolvers: Some(Resolvers {
                    id: id_resolver,
                    state: state_resolver,
                }),
            },
        });

        Ok(RegisteredResource { urn, id, state })
    }

    fn register_outputs(&self, urn: &Urn, outputs: PropertyMap) -> EngineResult<()> {
        let mut graph = self.graph.write();
        let index = *graph
            .index
            .get(urn)
            .ok_or_else(|| EngineError::UnknownResource(urn.clone()))?;

        match &mut graph.nodes[index].kind {
            NodeKind::Component { outputs: slot } => {
                debug!("Registering {} outputs for {}", outputs.len(), urn);
                *slot = Some(outputs);
            }
            NodeKind::Custom { .. } => {
                warn!("Ignoring outputs registered for custom resource {}", urn);
            }
        }
        Ok(())
    }

    fn resource_status(&self, urn: &Urn) -> Option<ResourceStatus> {
        self.graph.read().aggregate_status(urn)
    }
}

impl fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEngine")
            .field("stack", &self.stack)
            .field("project", &self.project)
            .field("declared", &self.graph.read().nodes.len())
            .finish_non_exhaustive()
    }
}
