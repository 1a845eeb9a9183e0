//! Cluster naming through an LLM.
//!
//! Clusters are grouped by the entity type of their representative and each
//! group is labeled in a single request. Failures never abort a run: a group
//! whose request or response is unusable gets generic labels.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use backon::Retryable;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CausegraphError, CgResult, ErrorCode};
use crate::retry::RetryPolicy;
use crate::traits::{GenerationOptions, Llm};
use crate::types::{CanonicalKey, Cluster, ClusterId, ClusterLabel, ClusterSet, EntityType, LabelSet, Message};

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Configuration for the cluster labeler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerConfig {
    /// Members listed per cluster in the prompt.
    pub max_members_per_cluster: usize,
    /// Maximum tokens for each labeling response.
    pub max_tokens: u32,
    /// Retry policy for transient LLM failures.
    pub retry: RetryPolicy,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            max_members_per_cluster: 15,
            max_tokens: 2000,
            retry: RetryPolicy::default(),
        }
    }
}

/// One row of the labels artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub cluster_id: ClusterId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub member_count: usize,
    #[serde(default)]
    pub members: Vec<CanonicalKey>,
}

/// Artifact rows for every labeled cluster, in id order.
pub fn label_records(labels: &LabelSet, clusters: &ClusterSet) -> Vec<LabelRecord> {
    labels
        .iter_sorted()
        .into_iter()
        .map(|(id, label)| {
            let members = clusters.get(&id).map(|c| c.members.clone()).unwrap_or_default();
            LabelRecord {
                cluster_id: id,
                name: label.name.clone(),
                description: label.description.clone(),
                member_count: members.len(),
                members,
            }
        })
        .collect()
}

impl From<Vec<LabelRecord>> for LabelSet {
    fn from(records: Vec<LabelRecord>) -> Self {
        records
            .into_iter()
            .map(|r| (r.cluster_id, ClusterLabel::new(r.name, r.description)))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    clusters: HashMap<String, RawLabel>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: Option<String>,
    description: Option<String>,
}

/// Names clusters with an LLM.
pub struct ClusterLabeler {
    llm: Arc<dyn Llm>,
    config: LabelerConfig,
}

impl ClusterLabeler {
    pub fn new(llm: Arc<dyn Llm>, config: LabelerConfig) -> Self {
        Self { llm, config }
    }

    /// Label every cluster. Never fails; unlabeled groups get generic labels.
    pub async fn label(&self, clusters: &ClusterSet) -> LabelSet {
        let mut labels = LabelSet::new();

        for (entity_type, group) in group_by_type(clusters) {
            info!(
                entity_type = %entity_type,
                clusters = group.len(),
                "Labeling clusters"
            );

            match self.label_group(entity_type, &group).await {
                Ok(group_labels) => {
                    debug!(entity_type = %entity_type, labeled = group_labels.len(), "Labels received");
                    labels.extend(group_labels);
                }
                Err(e) => {
                    warn!(
                        entity_type = %entity_type,
                        error = %e,
                        "Labeling failed, using generic labels"
                    );
                    for cluster in &group {
                        labels.insert(cluster.id, ClusterLabel::generic(cluster.id));
                    }
                }
            }
        }

        labels
    }

    async fn label_group(&self, entity_type: EntityType, group: &[&Cluster]) -> CgResult<LabelSet> {
        let messages = build_messages(entity_type, group, self.config.max_members_per_cluster);
        let options = GenerationOptions {
            max_tokens: Some(self.config.max_tokens),
            ..Default::default()
        };

        let llm = &self.llm;
        let messages = &messages;
        let options = &options;
        let generate_once = move || async move { llm.generate(messages, Some(options.clone())).await };

        let response = generate_once
            .retry(self.config.retry.backoff())
            .when(|e: &CausegraphError| e.is_transient())
            .notify(|err, dur| {
                warn!(
                    "Labeling {} clusters failed, retrying in {:?}: {}",
                    entity_type, dur, err
                );
            })
            .await?;

        let expected: Vec<ClusterId> = group.iter().map(|c| c.id).collect();
        parse_labels(response.content_or_empty(), &expected)
    }
}

/// Group clusters by the entity type of their representative.
fn group_by_type(clusters: &ClusterSet) -> BTreeMap<EntityType, Vec<&Cluster>> {
    let mut groups: BTreeMap<EntityType, Vec<&Cluster>> = BTreeMap::new();
    for cluster in clusters.values() {
        match EntityType::of_key(&cluster.representative) {
            Some(t) => groups.entry(t).or_default().push(cluster),
            None => warn!(
                cluster = cluster.id.0,
                representative = %cluster.representative,
                "Cluster representative has no entity type, skipping label"
            ),
        }
    }
    groups
}

fn build_messages(entity_type: EntityType, group: &[&Cluster], max_members: usize) -> Vec<Message> {
    let mut clusters_text = String::new();
    for cluster in group {
        let members: Vec<&str> = cluster.members.iter().take(max_members).map(|m| m.as_str()).collect();
        clusters_text.push_str(&format!("\n**{}**: {}\n", cluster.id, members.join(", ")));
    }

    let schema = serde_json::json!({
        "clusters": group
            .iter()
            .map(|c| (c.id.to_string(), serde_json::json!({"name": "string", "description": "string"})))
            .collect::<serde_json::Map<String, serde_json::Value>>()
    });
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();

    let system = format!(
        "You are an expert in human-AI interaction research. Analyze clusters of {} keywords \
         to identify meaningful patterns and themes. Respond with valid JSON matching the provided schema.",
        entity_type
    );

    let prompt = format!(
        "Analyze these {} clusters from human-AI interaction research. For each cluster, provide:\n\
         1. A descriptive name (3-8 words) that captures the essence of the cluster\n\
         2. A brief description (1-2 sentences) explaining what this cluster represents\n\n\
         Clusters to analyze:\n{}\n\
         Consider the semantic relationships between terms within each cluster and identify the \
         common themes or concepts they represent in human-AI interaction research.\n\n\
         Respond with JSON matching this exact structure: {}",
        entity_type.as_str().to_uppercase(),
        clusters_text,
        schema
    );

    vec![Message::system(system), Message::user(prompt)]
}

/// Parse `{"clusters": {"<id>": {"name", "description"}}}` out of free text.
///
/// The first `{` .. last `}` span is used, so code fences and surrounding
/// prose are tolerated. Ids outside `expected` are ignored.
pub fn parse_labels(text: &str, expected: &[ClusterId]) -> CgResult<LabelSet> {
    let json = JSON_OBJECT.find(text).map(|m| m.as_str()).ok_or_else(|| CausegraphError::Llm {
        message: "no JSON object in labeling response".to_string(),
        code: ErrorCode::LlmInvalidResponse,
        source: None,
    })?;

    let response: LabelResponse = serde_json::from_str(json).map_err(|e| CausegraphError::Llm {
        message: format!("invalid labeling JSON: {}", e),
        code: ErrorCode::LlmInvalidResponse,
        source: Some(Box::new(e)),
    })?;

    let mut labels = LabelSet::new();
    for (raw_id, raw) in response.clusters {
        let Ok(id) = raw_id.trim().parse::<usize>().map(ClusterId) else {
            debug!(id = %raw_id, "Ignoring non-numeric cluster id in labeling response");
            continue;
        };
        if !expected.contains(&id) {
            continue;
        }
        labels.insert(
            id,
            ClusterLabel::new(
                raw.name.unwrap_or_else(|| format!("Cluster {}", id)),
                raw.description.unwrap_or_else(|| "No description available".to_string()),
            ),
        );
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LlmResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockLlm {
        responses: Mutex<Vec<CgResult<String>>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlm {
        fn new(responses: Vec<CgResult<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Llm for MockLlm {
        async fn generate(&self, messages: &[Message], _options: Option<GenerationOptions>) -> CgResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(m) = messages.last() {
                self.prompts.lock().unwrap().push(m.content.clone());
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(CausegraphError::llm("no more responses"));
            }
            responses.remove(0).map(LlmResponse::text)
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn cluster(id: usize, members: &[&str]) -> Cluster {
        Cluster {
            id: ClusterId(id),
            representative: CanonicalKey::from(members[0]),
            members: members.iter().map(|m| CanonicalKey::from(*m)).collect(),
        }
    }

    fn fast_config() -> LabelerConfig {
        LabelerConfig {
            retry: RetryPolicy {
                max_retries: 2,
                initial_delay_ms: 1,
                max_delay_ms: 2,
                multiplier: 2.0,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_labels_tolerates_fences() {
        let text = "Here you go:\n```json\n{\"clusters\": {\"0\": {\"name\": \"Learners\", \"description\": \"Students\"}, \"9\": {\"name\": \"x\"}}}\n```";
        let labels = parse_labels(text, &[ClusterId(0), ClusterId(1)]).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get(ClusterId(0)).unwrap().name, "Learners");
        assert!(labels.get(ClusterId(1)).is_none());
    }

    #[test]
    fn test_parse_labels_defaults_missing_fields() {
        let labels = parse_labels(r#"{"clusters": {"3": {}}}"#, &[ClusterId(3)]).unwrap();
        let label = labels.get(ClusterId(3)).unwrap();
        assert_eq!(label.name, "Cluster 3");
        assert_eq!(label.description, "No description available");
    }

    #[test]
    fn test_parse_labels_rejects_garbage() {
        let err = parse_labels("I cannot help with that.", &[ClusterId(0)]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LlmInvalidResponse);
        assert!(parse_labels("{not json}", &[ClusterId(0)]).is_err());
    }

    #[tokio::test]
    async fn test_one_request_per_entity_type() {
        let llm = Arc::new(MockLlm::new(vec![
            Ok(r#"{"clusters": {"0": {"name": "Learners", "description": "d0"}, "2": {"name": "Trust", "description": "d2"}}}"#.to_string()),
            Ok(r#"{"clusters": {"1": {"name": "Tutors", "description": "d1"}}}"#.to_string()),
        ]));
        let mut clusters = ClusterSet::new();
        clusters.insert(ClusterId(0), cluster(0, &["human|student", "human|pupil"]));
        clusters.insert(ClusterId(1), cluster(1, &["ai|llm", "ai|chatbot"]));
        clusters.insert(ClusterId(2), cluster(2, &["human>trust", "human>reliance"]));

        let labeler = ClusterLabeler::new(llm.clone(), fast_config());
        let labels = labeler.label(&clusters).await;

        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        assert_eq!(labels.get(ClusterId(0)).unwrap().name, "Learners");
        assert_eq!(labels.get(ClusterId(1)).unwrap().name, "Tutors");
        assert_eq!(labels.get(ClusterId(2)).unwrap().name, "Trust");

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("HUMAN"));
        assert!(prompts[0].contains("human|pupil"));
        assert!(prompts[1].contains("ai|chatbot"));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let llm = Arc::new(MockLlm::new(vec![
            Err(CausegraphError::rate_limit("busy")),
            Ok(r#"{"clusters": {"0": {"name": "Learners", "description": "d"}}}"#.to_string()),
        ]));
        let mut clusters = ClusterSet::new();
        clusters.insert(ClusterId(0), cluster(0, &["human|student", "human|pupil"]));

        let labels = ClusterLabeler::new(llm.clone(), fast_config()).label(&clusters).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        assert_eq!(labels.get(ClusterId(0)).unwrap().name, "Learners");
    }

    #[tokio::test]
    async fn test_exhausted_retries_fall_back_to_generic() {
        let llm = Arc::new(MockLlm::new(vec![]));
        let mut clusters = ClusterSet::new();
        clusters.insert(ClusterId(4), cluster(4, &["co|team", "co|group"]));

        let labels = ClusterLabeler::new(llm.clone(), fast_config()).label(&clusters).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
        assert_eq!(labels.get(ClusterId(4)).unwrap(), &ClusterLabel::generic(ClusterId(4)));
    }

    #[tokio::test]
    async fn test_unparseable_output_is_not_retried() {
        let llm = Arc::new(MockLlm::new(vec![Ok("no idea".to_string())]));
        let mut clusters = ClusterSet::new();
        clusters.insert(ClusterId(0), cluster(0, &["ai|llm", "ai|gpt"]));

        let labels = ClusterLabeler::new(llm.clone(), fast_config()).label(&clusters).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert_eq!(labels.get(ClusterId(0)).unwrap().name, "Cluster 0");
    }

    #[test]
    fn test_prompt_truncates_members() {
        let members: Vec<String> = (0..20).map(|i| format!("ai|m{}", i)).collect();
        let refs: Vec<&str> = members.iter().map(|s| s.as_str()).collect();
        let c = cluster(0, &refs);
        let messages = build_messages(EntityType::Ai, &[&c], 15);
        assert!(messages[1].content.contains("ai|m14"));
        assert!(!messages[1].content.contains("ai|m15"));
    }

    #[test]
    fn test_label_records_round_trip_into_label_set() {
        let mut clusters = ClusterSet::new();
        clusters.insert(ClusterId(0), cluster(0, &["a", "b"]));
        let mut labels = LabelSet::new();
        labels.insert(ClusterId(0), ClusterLabel::new("n", "d"));

        let records = label_records(&labels, &clusters);
        assert_eq!(records[0].member_count, 2);
        assert_eq!(LabelSet::from(records), labels);
    }
}
