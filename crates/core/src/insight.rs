use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored analytical record about a domain.
///
/// Indexed fields live in dedicated columns; the free-form `payload` is
/// stored as an encoded blob and decoded on read. The indexed columns are
/// authoritative — they take precedence over any stale copy of the same
/// fields inside the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// Unique identifier, assigned by the caller or generated at write time
    pub id: String,
    /// Subject the insight is about
    pub domain: String,
    /// Optional classification category
    pub category: Option<String>,
    /// Name of the producing agent
    pub agent_name: Option<String>,
    /// Optional classification tag
    pub insight_type: Option<String>,
    /// Quality score, clamped to [0, 1] at write time
    pub quality_score: f64,
    /// Engagement score, clamped to [0, 1] at write time
    pub engagement_score: f64,
    /// Epoch seconds
    pub timestamp: i64,
    /// Full insight content and metadata
    pub payload: Value,
    /// Engagement metrics joined at read time, when recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<EngagementMetrics>,
    /// Producer rollup attached by agent-scoped queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_performance: Option<AgentPerformance>,
}

/// Write-side input for [`Insight`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInsight {
    /// Caller-assigned id; generated from submission time when absent
    pub id: Option<String>,
    pub domain: String,
    pub category: Option<String>,
    pub agent_name: Option<String>,
    pub insight_type: Option<String>,
    pub quality_score: f64,
    pub engagement_score: f64,
    /// Epoch seconds; defaults to now when absent
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub payload: Value,
}

impl NewInsight {
    /// Minimal input with the required fields only.
    pub fn new(domain: impl Into<String>, quality_score: f64, payload: Value) -> Self {
        Self {
            id: None,
            domain: domain.into(),
            category: None,
            agent_name: None,
            insight_type: None,
            quality_score,
            engagement_score: 0.0,
            timestamp: None,
            payload,
        }
    }

    /// Effective id: the caller's, or one minted from submission time.
    #[must_use]
    pub fn effective_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("insight_{}", Utc::now().timestamp_millis()))
    }

    /// Effective timestamp: the caller's, or now.
    #[must_use]
    pub fn effective_timestamp(&self) -> i64 {
        self.timestamp.unwrap_or_else(|| Utc::now().timestamp())
    }
}

/// Per-insight engagement metrics, written independently of the insight
/// and joined at read time. Absence is valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub click_rate: f64,
    pub retention_time: f64,
    pub share_rate: f64,
    pub requery_rate: f64,
    pub total_impressions: i64,
}

/// Lifecycle status of a producing agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
}

impl AgentStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(Self::Inactive),
            _ => Ok(Self::Active),
        }
    }
}

/// Per-agent rollup, upserted on every insight write carrying an agent name.
///
/// `avg_quality` and `avg_engagement` are exponential moving averages
/// (0.9 old / 0.1 new per update).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_name: String,
    /// Monotonic counter of insights written by this agent
    pub total_insights: i64,
    pub avg_quality: f64,
    pub avg_engagement: f64,
    /// Epoch seconds of the agent's most recent write
    pub last_active: i64,
    pub status: AgentStatus,
}

/// Optional predicates for insight search. All fields combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub domain: Option<String>,
    pub category: Option<String>,
    pub agent: Option<String>,
    pub min_quality: Option<f64>,
    pub max_quality: Option<f64>,
    /// Epoch-seconds lower bound on `timestamp`
    pub since: Option<i64>,
}
