//! SecurityCompliance specialist: scan_security, check_compliance,
//! assess_vulnerabilities, policy_check, recommendations, full (spec §4.11).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::errors::SreError;

use super::common::{outcome_data, outcome_succeeded, SpecialistDeps};

/// Severity weight assigned to each finding severity label, used to roll a
/// list of findings up into a single overall posture.
const FINDING_WEIGHTS: &[(&str, u32)] = &[("critical", 100), ("high", 40), ("medium", 10), ("low", 1)];

fn weight_for_severity(severity: &str) -> u32 {
    FINDING_WEIGHTS
        .iter()
        .find(|(label, _)| severity.eq_ignore_ascii_case(label))
        .map(|(_, weight)| *weight)
        .unwrap_or(0)
}

fn posture_for_score(score: u32) -> &'static str {
    match score {
        0 => "clean",
        1..=20 => "needs_attention",
        21..=99 => "at_risk",
        _ => "critical",
    }
}

pub struct SecurityComplianceAgent {
    state: AgentState,
    deps: SpecialistDeps,
}

impl SecurityComplianceAgent {
    pub fn new(deps: SpecialistDeps) -> Self {
        Self {
            state: AgentState::new("security-compliance"),
            deps,
        }
    }

    fn score_findings(findings: &Value) -> u32 {
        findings
            .as_array()
            .map(|list| {
                list.iter()
                    .map(|f| f.get("severity").and_then(Value::as_str).map(weight_for_severity).unwrap_or(0))
                    .sum()
            })
            .unwrap_or(0)
    }

    async fn scan_security(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "check_compliance_status", params.clone()).await;
        let data = outcome_data(&outcome);
        let findings = data.get("findings").cloned().unwrap_or(json!([]));
        let score = Self::score_findings(&findings);
        json!({
            "status": if outcome_succeeded(&outcome) {"success"} else {"error"},
            "findings": findings,
            "risk_score": score,
            "posture": posture_for_score(score),
        })
    }

    async fn check_compliance(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "check_compliance_status", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "compliance": outcome_data(&outcome)})
    }

    async fn assess_vulnerabilities(&self, workflow_id: &str, params: &Value) -> Value {
        let scan = self.scan_security(workflow_id, params).await;
        json!({"status": "success", "vulnerabilities": scan["findings"], "risk_score": scan["risk_score"]})
    }

    async fn policy_check(&self, workflow_id: &str, params: &Value) -> Value {
        let compliance = self.check_compliance(workflow_id, params).await;
        let compliant = compliance["compliance"]
            .get("compliant")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        json!({"status": "success", "policy_satisfied": compliant})
    }

    async fn recommendations(&self, workflow_id: &str, params: &Value) -> Value {
        let scan = self.scan_security(workflow_id, params).await;
        let posture = scan["posture"].as_str().unwrap_or("clean");
        let recs: Vec<&str> = match posture {
            "critical" => vec!["page security on-call", "isolate affected resources"],
            "at_risk" => vec!["schedule remediation this sprint"],
            "needs_attention" => vec!["track findings in backlog"],
            _ => vec!["no action needed"],
        };
        json!({"status": "success", "posture": posture, "recommendations": recs})
    }

    async fn full(&self, workflow_id: &str, params: &Value) -> Value {
        let scan = self.scan_security(workflow_id, params).await;
        let compliance = self.check_compliance(workflow_id, params).await;
        let recommendations = self.recommendations(workflow_id, params).await;
        json!({"status": "success", "scan": scan, "compliance": compliance, "recommendations": recommendations})
    }
}

#[async_trait]
impl BaseAgent for SecurityComplianceAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let query = request.parameters.get("query").and_then(Value::as_str).unwrap_or("security review");
        let workflow_id = self.deps.ensure_workflow(request.workflow_id.as_deref(), query).await;
        let params = &request.parameters;

        let result = match request.action.as_str() {
            "scan_security" => self.scan_security(&workflow_id, params).await,
            "check_compliance" => self.check_compliance(&workflow_id, params).await,
            "assess_vulnerabilities" => self.assess_vulnerabilities(&workflow_id, params).await,
            "policy_check" => self.policy_check(&workflow_id, params).await,
            "recommendations" => self.recommendations(&workflow_id, params).await,
            "full" => self.full(&workflow_id, params).await,
            other => return Err(SreError::ExecutionError(format!("security-compliance has no verb '{other}'"))),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posture_escalates_with_finding_score() {
        assert_eq!(posture_for_score(0), "clean");
        assert_eq!(posture_for_score(15), "needs_attention");
        assert_eq!(posture_for_score(50), "at_risk");
        assert_eq!(posture_for_score(150), "critical");
    }

    #[test]
    fn findings_are_scored_by_severity_weight() {
        let findings = json!([{"severity": "high"}, {"severity": "low"}]);
        assert_eq!(SecurityComplianceAgent::score_findings(&findings), 41);
    }
}
