//! TTL-keyed cache of tool-result values (C1).
//!
//! Key derivation, TTL profiles, and the never-cache set are carried
//! bit-exact from the original tool cache so that two callers computing
//! the same canonical JSON for a cacheable tool share an entry.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Named TTL profiles, in seconds.
pub const TTL_REAL_TIME: u64 = 60;
pub const TTL_SHORT: u64 = 300;
pub const TTL_MEDIUM: u64 = 1800;
pub const TTL_LONG: u64 = 3600;
pub const TTL_DAILY: u64 = 86400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlProfile {
    RealTime,
    Short,
    Medium,
    Long,
    Daily,
}

impl TtlProfile {
    pub fn seconds(self) -> u64 {
        match self {
            Self::RealTime => TTL_REAL_TIME,
            Self::Short => TTL_SHORT,
            Self::Medium => TTL_MEDIUM,
            Self::Long => TTL_LONG,
            Self::Daily => TTL_DAILY,
        }
    }

    fn from_tool(tool_name: &str) -> Option<Self> {
        TOOL_TTL_MAP
            .iter()
            .find(|(name, _)| *name == tool_name)
            .map(|(_, profile)| *profile)
    }
}

/// Static tool-name → TTL-profile table, carried verbatim from the source
/// cache manager's `TOOL_TTL_MAP`. Tools absent from this table are not
/// cached on `set` unless an explicit profile override is supplied.
const TOOL_TTL_MAP: &[(&str, TtlProfile)] = &[
    ("get_performance_metrics", TtlProfile::RealTime),
    ("identify_bottlenecks", TtlProfile::RealTime),
    ("detect_metric_anomalies", TtlProfile::RealTime),
    ("check_resource_health", TtlProfile::Short),
    ("check_container_app_health", TtlProfile::Short),
    ("check_aks_cluster_health", TtlProfile::Short),
    ("correlate_alerts", TtlProfile::Short),
    ("get_request_telemetry", TtlProfile::Short),
    ("analyze_resource_configuration", TtlProfile::Medium),
    ("get_cost_analysis", TtlProfile::Medium),
    ("get_cost_recommendations", TtlProfile::Medium),
    ("analyze_cost_anomalies", TtlProfile::Medium),
    ("query_app_service_configuration", TtlProfile::Medium),
    ("query_container_app_configuration", TtlProfile::Medium),
    ("query_aks_configuration", TtlProfile::Medium),
    ("query_apim_configuration", TtlProfile::Medium),
    ("get_resource_dependencies", TtlProfile::Long),
    ("get_slo_dashboard", TtlProfile::Long),
    ("analyze_dependency_map", TtlProfile::Long),
    ("calculate_error_budget", TtlProfile::Long),
    ("predict_resource_exhaustion", TtlProfile::Long),
    ("get_security_score", TtlProfile::Daily),
    ("check_compliance_status", TtlProfile::Daily),
    ("list_security_recommendations", TtlProfile::Daily),
    ("identify_orphaned_resources", TtlProfile::Daily),
    ("describe_capabilities", TtlProfile::Daily),
];

/// Tools that are never cached: mutations, notifications, and unique
/// per-call operations. Carried verbatim from the source's `NEVER_CACHE`.
const NEVER_CACHE: &[&str] = &[
    "triage_incident",
    "plan_remediation",
    "execute_safe_restart",
    "execute_restart_resource",
    "scale_resource",
    "execute_scale_resource",
    "clear_cache",
    "execute_clear_redis_cache",
    "send_teams_notification",
    "send_teams_alert",
    "send_sre_status_update",
    "define_slo",
    "generate_incident_summary",
    "generate_postmortem",
    "execute_automation_runbook",
    "create_incident_ticket",
    "get_audit_trail",
];

/// Keys stripped from arguments before hashing — these carry call context,
/// not call identity.
const CONTEXT_LIKE_KEYS: &[&str] = &["context", "ctx", "_context"];

fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonical_value(v)))
                .collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON of `args` with context-like keys removed, used as the
/// hash input for cache-key derivation.
pub fn canonical_json(args: &Value) -> String {
    let filtered = match args {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !CONTEXT_LIKE_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    };
    serde_json::to_string(&canonical_value(&filtered)).unwrap_or_default()
}

/// `tool_name + ":" + hex12(md5(canonical_json(args)))`, bit-exact with
/// spec §6's cache-key derivation.
pub fn make_key(tool_name: &str, args: &Value) -> String {
    use md5::{Digest, Md5};
    let json = canonical_json(args);
    let digest = Md5::digest(json.as_bytes());
    let hex = hex::encode(digest);
    format!("{tool_name}:{}", &hex[..12])
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    created_at: Instant,
    expires_at: Instant,
}

struct Inner {
    entries: std::collections::HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// TTL-based in-memory cache of tool results, fronting the tool catalog.
pub struct ToolCache {
    inner: Mutex<Inner>,
    max_entries: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_percent: f64,
}

impl ToolCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: std::collections::HashMap::new(),
                hits: 0,
                misses: 0,
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a cached value. Never fails the caller: any internal error
    /// degrades to a miss.
    pub fn get(&self, tool_name: &str, args: &Value) -> Option<Value> {
        if NEVER_CACHE.contains(&tool_name) {
            return None;
        }
        let key = make_key(tool_name, args);
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        match inner.entries.get(&key) {
            Some(entry) if Instant::now() <= entry.expires_at => {
                inner.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                inner.entries.remove(&key);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a value under the tool's TTL profile (or an explicit override).
    /// No-op for never-cached tools and tools absent from the TTL table.
    pub fn set(&self, tool_name: &str, args: &Value, value: Value, profile: Option<TtlProfile>) {
        if NEVER_CACHE.contains(&tool_name) {
            return;
        }
        let Some(profile) = profile.or_else(|| TtlProfile::from_tool(tool_name)) else {
            return;
        };
        let key = make_key(tool_name, args);
        let now = Instant::now();
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.entries.len() >= self.max_entries {
            evict_expired(&mut inner.entries, now);
            if inner.entries.len() >= self.max_entries {
                evict_oldest(&mut inner.entries, (self.max_entries / 10).max(1));
            }
        }
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + Duration::from_secs(profile.seconds()),
            },
        );
    }

    /// Remove a specific entry, or every entry for `tool_name` if `args` is
    /// `None`. Returns the number of entries removed.
    pub fn invalidate(&self, tool_name: &str, args: Option<&Value>) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        if let Some(args) = args {
            let key = make_key(tool_name, args);
            usize::from(inner.entries.remove(&key).is_some())
        } else {
            let prefix = format!("{tool_name}:");
            let keys: Vec<String> = inner
                .entries
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            for k in &keys {
                inner.entries.remove(k);
            }
            keys.len()
        }
    }

    pub fn invalidate_all(&self) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        let count = inner.entries.len();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
        count
    }

    pub fn stats(&self) -> CacheStats {
        let Ok(inner) = self.inner.lock() else {
            return CacheStats {
                entries: 0,
                max_entries: self.max_entries,
                hits: 0,
                misses: 0,
                hit_rate_percent: 0.0,
            };
        };
        let total = inner.hits + inner.misses;
        let hit_rate = if total > 0 {
            (inner.hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            entries: inner.entries.len(),
            max_entries: self.max_entries,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate_percent: (hit_rate * 10.0).round() / 10.0,
        }
    }
}

fn evict_expired(entries: &mut std::collections::HashMap<String, CacheEntry>, now: Instant) {
    entries.retain(|_, entry| now <= entry.expires_at);
}

fn evict_oldest(entries: &mut std::collections::HashMap<String, CacheEntry>, count: usize) {
    let mut by_age: Vec<(&String, Instant)> = entries.iter().map(|(k, v)| (k, v.created_at)).collect();
    by_age.sort_by_key(|(_, created_at)| *created_at);
    let to_remove: Vec<String> = by_age.into_iter().take(count).map(|(k, _)| k.clone()).collect();
    for k in to_remove {
        entries.remove(&k);
    }
}
