//! Intent classification: a list of `(category, [(regex, tool_names)])`
//! entries, matched in declared order against the lowercased query.

use std::sync::LazyLock;

use regex::Regex;

pub struct IntentRule {
    pub pattern: Regex,
    pub tools: &'static [&'static str],
}

pub struct CategoryRules {
    pub category: &'static str,
    pub rules: Vec<IntentRule>,
}

fn rule(pattern: &str, tools: &'static [&'static str]) -> IntentRule {
    IntentRule {
        pattern: Regex::new(pattern).expect("intent pattern must compile"),
        tools,
    }
}

/// The default intent table (spec §4.10), carried from the source
/// orchestrator's `_build_intent_patterns`. Matching order is the
/// declared order; the first regex that matches the lowercased query
/// wins and contributes its tool list.
pub static INTENT_TABLE: LazyLock<Vec<CategoryRules>> = LazyLock::new(|| {
    vec![
        CategoryRules {
            category: "health",
            rules: vec![
                rule(r"(check|health|status).*container\s*app", &["check_container_app_health"]),
                rule(r"(check|health|status).*(aks|kubernetes)", &["check_aks_cluster_health"]),
                rule(r"(check|health|status).*resource", &["check_resource_health"]),
                rule(r"depend(ency|encies)", &["get_resource_dependencies"]),
                rule(r"\bhealth\b", &["check_resource_health"]),
            ],
        },
        CategoryRules {
            category: "incident",
            rules: vec![
                rule(r"\b(incident|outage|down|triage)\b", &["triage_incident", "correlate_alerts"]),
                rule(r"\broot\s*cause\b|\brca\b", &["get_resource_dependencies", "triage_incident"]),
                rule(r"\bpostmortem\b", &["generate_postmortem"]),
            ],
        },
        CategoryRules {
            category: "performance",
            rules: vec![
                rule(r"\bbottleneck", &["identify_bottlenecks"]),
                rule(r"\banomal(y|ies)\b", &["detect_metric_anomalies"]),
                rule(r"\b(performance|latency|slow|throughput)\b", &["get_performance_metrics"]),
                rule(r"\bcapacity\b", &["predict_resource_exhaustion"]),
            ],
        },
        CategoryRules {
            category: "cost",
            rules: vec![
                rule(r"\border?phan", &["identify_orphaned_resources"]),
                rule(r"\b(cost|spend|saving|budget)\b.*\banomal", &["analyze_cost_anomalies"]),
                rule(r"\b(cost|spend|saving)\b", &["get_cost_analysis", "get_cost_recommendations"]),
            ],
        },
        CategoryRules {
            category: "slo",
            rules: vec![
                rule(r"\berror\s*budget\b", &["calculate_error_budget"]),
                rule(r"\bslo\b|\bservice\s*level\b", &["get_slo_dashboard"]),
            ],
        },
        CategoryRules {
            category: "security",
            rules: vec![
                rule(r"\bcompliance\b", &["check_compliance_status"]),
                rule(r"\bvulnerab", &["list_security_recommendations"]),
                rule(r"\bsecurity\b", &["get_security_score"]),
            ],
        },
        CategoryRules {
            category: "remediation",
            rules: vec![
                rule(r"\brestart\b", &["execute_safe_restart"]),
                rule(r"\bscale\b", &["scale_resource"]),
                rule(r"\bremediat", &["plan_remediation"]),
                rule(r"\brunbook\b", &["execute_automation_runbook"]),
            ],
        },
        CategoryRules {
            category: "config",
            rules: vec![
                rule(r"\bconfig(uration)?\b.*drift", &["analyze_resource_configuration"]),
                rule(r"\bconfig(uration)?\b", &["analyze_resource_configuration"]),
            ],
        },
    ]
});

/// Classifies `query`, returning `(category, tool_names)`. Falls back to
/// `("general", ["describe_capabilities"])` when nothing matches.
pub fn classify(query: &str) -> (&'static str, &'static [&'static str]) {
    let query_lower = query.to_lowercase();
    for category_rules in INTENT_TABLE.iter() {
        for rule in &category_rules.rules {
            if rule.pattern.is_match(&query_lower) {
                return (category_rules.category, rule.tools);
            }
        }
    }
    ("general", &["describe_capabilities"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_query_routes_to_health_category() {
        let (category, tools) = classify("check health of container app my-app in prod-rg");
        assert_eq!(category, "health");
        assert_eq!(tools, &["check_container_app_health"]);
    }

    #[test]
    fn incident_query_routes_to_incident_category() {
        let (category, _) = classify("we have an incident, the service is down");
        assert_eq!(category, "incident");
    }

    #[test]
    fn performance_query_routes_to_performance_category() {
        let (category, _) = classify("find bottlenecks in prod-rg");
        assert_eq!(category, "performance");
    }

    #[test]
    fn cost_query_routes_to_cost_category() {
        let (category, _) = classify("find cost savings in prod-rg");
        assert_eq!(category, "cost");
    }

    #[test]
    fn slo_query_routes_to_slo_category() {
        let (category, _) = classify("show me the slo dashboard");
        assert_eq!(category, "slo");
    }

    #[test]
    fn security_query_routes_to_security_category() {
        let (category, _) = classify("check compliance status for prod-rg");
        assert_eq!(category, "security");
    }

    #[test]
    fn remediation_query_routes_to_remediation_category() {
        let (category, _) = classify("restart the container app my-app");
        assert_eq!(category, "remediation");
    }

    #[test]
    fn config_query_routes_to_config_category() {
        let (category, _) = classify("analyze the configuration of my-app");
        assert_eq!(category, "config");
    }

    #[test]
    fn unmatched_query_falls_back_to_general() {
        let (category, tools) = classify("tell me a joke");
        assert_eq!(category, "general");
        assert_eq!(tools, &["describe_capabilities"]);
    }
}
