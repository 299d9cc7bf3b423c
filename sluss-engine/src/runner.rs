//! Scenario runner: provisioning, execution, reporting.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, instrument};

use sluss_config::{validate_structure, ScenarioFile, TaskKind, TaskNode};
use sluss_core::{
    Amount, ChainOracle, NodeHandle, NodeIndex, NodeRpc, PfsApi, ProcessControl, ScenarioError,
    TaskError, UdcApi,
};

use crate::context::{RunContext, Timing};
use crate::interpreter::{execute, TaskStatus};
use crate::path::TaskPath;

/// The collaborator set a run executes against. The engine implements
/// none of these; `sluss-sim` provides the in-memory set.
#[derive(Clone)]
pub struct Collaborators {
    pub rpc: Arc<dyn NodeRpc>,
    pub process: Arc<dyn ProcessControl>,
    pub chain: Arc<dyn ChainOracle>,
    pub pfs: Option<Arc<dyn PfsApi>>,
    pub udc: Option<Arc<dyn UdcApi>>,
}

/// One failed leaf, with enough context to reproduce.
#[derive(Debug, Clone)]
pub struct FailedTask {
    pub path: String,
    pub name: &'static str,
    pub error: TaskError,
}

/// Final verdict of a scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub passed: bool,
    /// Leaves that reached Succeeded or Failed.
    pub tasks_run: usize,
    /// Leaves never started because an earlier serial sibling failed.
    pub cancelled: usize,
    pub failures: Vec<FailedTask>,
    pub duration: Duration,
}

impl std::fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.passed { "PASSED" } else { "FAILED" };
        writeln!(
            f,
            "scenario {verdict}: {} task(s) run, {} cancelled, {} failure(s) in {:.2?}",
            self.tasks_run,
            self.cancelled,
            self.failures.len(),
            self.duration
        )?;
        for failure in &self.failures {
            writeln!(f, "  {}: {}", failure.path, failure.error)?;
        }
        Ok(())
    }
}

pub struct ScenarioRunner {
    collaborators: Collaborators,
}

impl ScenarioRunner {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Validate, provision, execute the root task node, and report.
    ///
    /// Provisioning or validation failure aborts before any task runs;
    /// task failures are part of the returned report, not errors here.
    #[instrument(skip_all)]
    pub async fn run(&self, scenario: &ScenarioFile) -> Result<ScenarioReport, ScenarioError> {
        validate_structure(scenario)?;
        self.provision(scenario).await?;

        let handles: Vec<Arc<NodeHandle>> = (0..scenario.nodes.count)
            .map(|i| Arc::new(NodeHandle::new(NodeIndex(i), self.collaborators.rpc.clone())))
            .collect();
        let ctx = Arc::new(RunContext::new(
            handles,
            self.collaborators.chain.clone(),
            self.collaborators.process.clone(),
            self.collaborators.pfs.clone(),
            Timing::from(&scenario.settings),
        ));
        info!(
            nodes = scenario.nodes.count,
            leaves = scenario.scenario.leaf_count(),
            "scenario provisioned"
        );

        let started = Instant::now();
        let outcome = execute(ctx, scenario.scenario.clone(), TaskPath::root()).await;
        let duration = started.elapsed();

        let mut tasks_run = 0;
        let mut cancelled = 0;
        let mut failures = Vec::new();
        for leaf in outcome.leaves {
            match leaf.status {
                TaskStatus::Cancelled => cancelled += 1,
                TaskStatus::Failed => {
                    tasks_run += 1;
                    failures.push(FailedTask {
                        path: leaf.path.to_string(),
                        name: leaf.name,
                        error: leaf.error.unwrap_or(TaskError::Rpc(
                            sluss_core::RpcError::Transport("unrecorded failure".to_string()),
                        )),
                    });
                }
                _ => tasks_run += 1,
            }
        }

        let report = ScenarioReport {
            passed: outcome.status == TaskStatus::Succeeded,
            tasks_run,
            cancelled,
            failures,
            duration,
        };
        info!(passed = report.passed, failures = report.failures.len(), "scenario finished");
        Ok(report)
    }

    /// Reachability probes and service pre-funding. Any failure here is
    /// fatal: no task has run yet.
    async fn provision(&self, scenario: &ScenarioFile) -> Result<(), ScenarioError> {
        self.collaborators
            .chain
            .current_height()
            .await
            .map_err(|e| ScenarioError::Provisioning(format!("chain oracle unreachable: {e}")))?;

        if uses_pfs(&scenario.scenario) {
            let pfs = self.collaborators.pfs.as_ref().ok_or_else(|| {
                ScenarioError::Provisioning(
                    "scenario asserts path-finding state but no PFS is configured".to_string(),
                )
            })?;
            pfs.iou(NodeIndex(0))
                .await
                .map_err(|e| ScenarioError::Provisioning(format!("PFS unreachable: {e}")))?;
        }

        if let Some(amount) = udc_deposit_amount(scenario) {
            let udc = self.collaborators.udc.as_ref().ok_or_else(|| {
                ScenarioError::Provisioning(
                    "settings enable UDC deposits but no UDC is configured".to_string(),
                )
            })?;
            for node in 0..scenario.nodes.count {
                udc.deposit(NodeIndex(node), amount).await.map_err(|e| {
                    ScenarioError::Provisioning(format!("UDC deposit for node {node} failed: {e}"))
                })?;
            }
        }
        Ok(())
    }
}

fn uses_pfs(node: &TaskNode) -> bool {
    match node {
        TaskNode::Serial(children) | TaskNode::Parallel(children) => {
            children.iter().any(uses_pfs)
        }
        TaskNode::Leaf(kind) => matches!(
            kind,
            TaskKind::AssertPfsHistory(_) | TaskKind::AssertPfsIou(_)
        ),
    }
}

/// Per-node UDC collateral to fund during provisioning, if enabled.
fn udc_deposit_amount(scenario: &ScenarioFile) -> Option<Amount> {
    let udc = scenario.settings.services.udc.as_ref()?;
    if !udc.enable {
        return None;
    }
    let token = udc.token.as_ref()?;
    if !token.deposit {
        return None;
    }
    token
        .balance_per_node
        .or(scenario.token.balance_fund)
        .filter(|amount| *amount > 0)
}
