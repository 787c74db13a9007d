//! Idempotent accumulation of usage and cost counters.

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::mission::ExecutionLogEntry;

/// Cumulative usage counters for one mission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub total_cost: f64,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_native_tokens: u64,
    pub total_web_search_calls: u64,
}

/// The operation a billable call belongs to. Only the kinds in
/// [`OperationKind::audit_identity`] produce an audit log entry here; agents
/// covering other kinds log their own calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    QueryPreparation,
    Routing,
    StrategySelection,
    AgentCall,
}

impl OperationKind {
    fn audit_identity(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::QueryPreparation => Some(("QueryPreparer", "Query Preparation")),
            Self::Routing => Some(("Router", "Routing Decision")),
            Self::StrategySelection => Some(("QueryStrategy", "Strategy Selection")),
            Self::AgentCall => None,
        }
    }
}

/// Usage reported for one billable operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageReport {
    pub model_name: Option<String>,
    pub cost: Option<f64>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub native_total_tokens: Option<u64>,
    pub web_search_count: u64,
    pub call_id: Option<String>,
    pub timestamp: Option<f64>,
    pub duration_secs: Option<f64>,
    pub operation: Option<OperationKind>,
    /// Set when the calling agent already wrote its own log entry.
    pub agent_logged: bool,
}

impl UsageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_tokens(mut self, prompt: u64, completion: u64) -> Self {
        self.prompt_tokens = Some(prompt);
        self.completion_tokens = Some(completion);
        self
    }

    pub fn with_native_total(mut self, native: u64) -> Self {
        self.native_total_tokens = Some(native);
        self
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    pub fn with_operation(mut self, operation: OperationKind) -> Self {
        self.operation = Some(operation);
        self
    }

    fn is_vacuous(&self) -> bool {
        self.cost.is_none()
            && self.prompt_tokens.is_none()
            && self.completion_tokens.is_none()
            && self.native_total_tokens.is_none()
            && self.web_search_count == 0
    }
}

/// Result of applying one usage report.
#[derive(Debug, Clone)]
pub struct StatsApplied {
    pub snapshot: StatsSnapshot,
    /// Present when the call is billable and not attributed to a
    /// self-logging agent; the orchestrator appends it to the execution log.
    pub audit: Option<ExecutionLogEntry>,
}

/// Accumulates usage per mission, suppressing duplicate call ids for the
/// process lifetime.
#[derive(Default)]
pub struct StatsAggregator {
    totals: DashMap<String, StatsSnapshot>,
    tracked_calls: DashSet<String>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, mission_id: &str) -> StatsSnapshot {
        self.totals
            .get(mission_id)
            .map(|s| *s)
            .unwrap_or_default()
    }

    /// Applies one usage report. Returns None when the report is vacuous or
    /// its call id was already counted (and `force` is unset).
    pub fn apply(
        &self,
        mission_id: &str,
        mut usage: UsageReport,
        force: bool,
    ) -> Option<StatsApplied> {
        if usage.call_id.is_none() && !force {
            // Best-effort synthesis, not collision-proof.
            let model = usage.model_name.as_deref().unwrap_or("unknown");
            let timestamp = usage.timestamp.unwrap_or(0.0);
            let duration = usage.duration_secs.unwrap_or(0.0);
            usage.call_id = Some(format!("{}_{}_{}", model, timestamp, duration));
        }

        if let Some(call_id) = &usage.call_id {
            if !force && self.tracked_calls.contains(call_id) {
                debug!(mission_id, call_id, "Skipping duplicate stats update");
                return None;
            }
            self.tracked_calls.insert(call_id.clone());
        }

        if usage.is_vacuous() {
            return None;
        }

        let cost_inc = usage.cost.unwrap_or(0.0);
        let prompt_inc = usage.prompt_tokens.unwrap_or(0);
        let completion_inc = usage.completion_tokens.unwrap_or(0);
        let native_inc = usage.native_total_tokens.unwrap_or(0);

        let mut entry = self.totals.entry(mission_id.to_string()).or_default();
        let stats = entry.value_mut();

        stats.total_cost += cost_inc;
        stats.total_prompt_tokens += prompt_inc;
        stats.total_completion_tokens += completion_inc;
        stats.total_web_search_calls += usage.web_search_count;

        // Granular reporting is authoritative over combined reporting: a
        // call carrying only a native total accumulates independently, but
        // any granular call redefines the native total from the running
        // prompt+completion sums. A provider alternating between the two
        // styles within one mission can undercount; intentionally left as-is.
        if native_inc > 0 && prompt_inc == 0 && completion_inc == 0 {
            stats.total_native_tokens += native_inc;
        } else if prompt_inc > 0 || completion_inc > 0 {
            stats.total_native_tokens = stats.total_prompt_tokens + stats.total_completion_tokens;
        }

        let snapshot = *stats;
        drop(entry);

        debug!(
            mission_id,
            cost = cost_inc,
            prompt = prompt_inc,
            completion = completion_inc,
            total_cost = snapshot.total_cost,
            "Updated mission stats"
        );

        let audit = self.build_audit(&usage, cost_inc, prompt_inc + completion_inc);
        Some(StatsApplied { snapshot, audit })
    }

    /// Every billable event is audited exactly once: callers that never log
    /// directly (query preparation, routing, strategy selection) get their
    /// entry here.
    fn build_audit(
        &self,
        usage: &UsageReport,
        cost_inc: f64,
        token_total: u64,
    ) -> Option<ExecutionLogEntry> {
        if cost_inc <= 0.0 || usage.agent_logged {
            return None;
        }
        let (agent_name, action) = usage.operation.and_then(|op| op.audit_identity())?;
        let model = usage.model_name.as_deref().unwrap_or("unknown");
        Some(
            ExecutionLogEntry::new(agent_name, action)
                .with_input_summary(format!("Model: {}", model))
                .with_output_summary(format!("Tokens: {}", token_total))
                .with_model_details(json!({
                    "model_name": model,
                    "cost": cost_inc,
                    "call_id": usage.call_id,
                })),
        )
    }

    /// Forgets a mission's running totals. Tracked call ids are kept for the
    /// process lifetime so a revived mission cannot double-count.
    pub fn remove(&self, mission_id: &str) {
        self.totals.remove(mission_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_call_id_counts_once() {
        let aggregator = StatsAggregator::new();
        let usage = UsageReport::new().with_cost(0.5).with_call_id("c1");
        assert!(aggregator.apply("m1", usage.clone(), false).is_some());
        assert!(aggregator.apply("m1", usage, false).is_none());
        assert_eq!(aggregator.snapshot("m1").total_cost, 0.5);
    }

    #[test]
    fn test_force_bypasses_dedup() {
        let aggregator = StatsAggregator::new();
        let usage = UsageReport::new().with_cost(0.5).with_call_id("c1");
        aggregator.apply("m1", usage.clone(), false);
        assert!(aggregator.apply("m1", usage, true).is_some());
        assert_eq!(aggregator.snapshot("m1").total_cost, 1.0);
    }

    #[test]
    fn test_native_derived_from_granular() {
        let aggregator = StatsAggregator::new();
        aggregator.apply(
            "m1",
            UsageReport::new().with_tokens(10, 5).with_call_id("a"),
            false,
        );
        aggregator.apply(
            "m1",
            UsageReport::new().with_tokens(20, 0).with_call_id("b"),
            false,
        );
        let stats = aggregator.snapshot("m1");
        assert_eq!(stats.total_prompt_tokens, 30);
        assert_eq!(stats.total_completion_tokens, 5);
        assert_eq!(stats.total_native_tokens, 35);
    }

    #[test]
    fn test_combined_only_accumulates_independently() {
        let aggregator = StatsAggregator::new();
        aggregator.apply(
            "m1",
            UsageReport::new().with_native_total(100).with_call_id("a"),
            false,
        );
        aggregator.apply(
            "m1",
            UsageReport::new().with_native_total(50).with_call_id("b"),
            false,
        );
        assert_eq!(aggregator.snapshot("m1").total_native_tokens, 150);
    }

    #[test]
    fn test_synthesized_id_dedups_identical_reports() {
        let aggregator = StatsAggregator::new();
        let usage = UsageReport {
            model_name: Some("fast-model".to_string()),
            cost: Some(0.1),
            timestamp: Some(1000.0),
            duration_secs: Some(2.5),
            ..UsageReport::default()
        };
        assert!(aggregator.apply("m1", usage.clone(), false).is_some());
        assert!(aggregator.apply("m1", usage, false).is_none());
    }

    #[test]
    fn test_vacuous_report_is_noop() {
        let aggregator = StatsAggregator::new();
        assert!(
            aggregator
                .apply("m1", UsageReport::new().with_call_id("c1"), false)
                .is_none()
        );
        assert_eq!(aggregator.snapshot("m1"), StatsSnapshot::default());
    }

    #[test]
    fn test_audit_for_allow_listed_operation() {
        let aggregator = StatsAggregator::new();
        let applied = aggregator
            .apply(
                "m1",
                UsageReport::new()
                    .with_cost(0.02)
                    .with_model("fast-model")
                    .with_operation(OperationKind::Routing)
                    .with_call_id("c1"),
                false,
            )
            .unwrap();
        let audit = applied.audit.unwrap();
        assert_eq!(audit.agent_name, "Router");
        assert_eq!(audit.action, "Routing Decision");
    }

    #[test]
    fn test_no_audit_when_agent_logged_or_free() {
        let aggregator = StatsAggregator::new();
        let mut usage = UsageReport::new()
            .with_cost(0.02)
            .with_operation(OperationKind::Routing)
            .with_call_id("c1");
        usage.agent_logged = true;
        assert!(aggregator.apply("m1", usage, false).unwrap().audit.is_none());

        let free = UsageReport::new()
            .with_tokens(5, 5)
            .with_operation(OperationKind::Routing)
            .with_call_id("c2");
        assert!(aggregator.apply("m1", free, false).unwrap().audit.is_none());
    }
}
