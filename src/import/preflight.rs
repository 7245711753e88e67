//! Provider connectivity preflight.
//!
//! Two cheap searches run before a bulk import so that a dead or blocked
//! provider fails the session once instead of failing every row.

use crate::{
    config::ImportConfig,
    models::{PreflightClassification, PreflightResult},
    provider::{ProviderClient, ProviderError},
};

/// Queries used by the preflight
#[derive(Debug, Clone)]
pub struct PreflightChecks {
    /// Generic query that should always return results
    pub liveness_query: String,
    /// Popular, stable title the provider must know
    pub reference_title: String,
}

impl From<&ImportConfig> for PreflightChecks {
    fn from(config: &ImportConfig) -> Self {
        Self {
            liveness_query: config.liveness_query.clone(),
            reference_title: config.reference_title.clone(),
        }
    }
}

fn hint(classification: PreflightClassification) -> &'static str {
    match classification {
        PreflightClassification::CrossOriginBlocked => {
            "The provider refused requests from this server. Check the API key and any proxy in front of the provider."
        }
        PreflightClassification::NoResults => {
            "The provider answered but returned nothing for a well-known query. Check the API quota and whether the provider API changed."
        }
        PreflightClassification::NetworkError => {
            "The provider could not be reached. Check network connectivity and the provider status page, then retry."
        }
        PreflightClassification::Ok => "",
    }
}

fn result(classification: PreflightClassification, detail: String) -> PreflightResult {
    PreflightResult {
        ok: classification == PreflightClassification::Ok,
        classification,
        detail,
        hint: hint(classification).to_string(),
    }
}

/// Structural mapping of a provider failure to a preflight class
pub fn classify(error: &ProviderError) -> PreflightClassification {
    match error {
        ProviderError::Blocked { .. } => PreflightClassification::CrossOriginBlocked,
        ProviderError::Timeout(_)
        | ProviderError::Network(_)
        | ProviderError::Status { .. }
        | ProviderError::Decode(_) => PreflightClassification::NetworkError,
    }
}

/// Run one search; `Err` carries the failing result.
async fn check(client: &dyn ProviderClient, label: &str, query: &str) -> Result<usize, PreflightResult> {
    match client.search(query).await {
        Ok(candidates) if candidates.is_empty() => Err(result(
            PreflightClassification::NoResults,
            format!("{} query '{}' returned no results", label, query),
        )),
        Ok(candidates) => Ok(candidates.len()),
        Err(e) => Err(result(
            classify(&e),
            format!("{} query '{}' failed: {}", label, query, e),
        )),
    }
}

/// Check provider reachability. A failing check skips the remaining one.
pub async fn preflight(client: &dyn ProviderClient, checks: &PreflightChecks) -> PreflightResult {
    tracing::info!("Provider preflight started");

    let outcome = async {
        check(client, "liveness", &checks.liveness_query).await?;
        let hits = check(client, "reference", &checks.reference_title).await?;
        Ok::<_, PreflightResult>(result(
            PreflightClassification::Ok,
            format!(
                "provider reachable; reference query '{}' returned {} result(s)",
                checks.reference_title, hits
            ),
        ))
    }
    .await;

    let result = outcome.unwrap_or_else(|failed| failed);
    if result.ok {
        tracing::info!("Provider preflight passed: {}", result.detail);
    } else {
        tracing::warn!(
            classification = %result.classification,
            "Provider preflight failed: {}",
            result.detail
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::ProviderCandidate, provider::MockProviderClient};
    use mockall::predicate::eq;

    fn checks() -> PreflightChecks {
        PreflightChecks {
            liveness_query: "a".to_string(),
            reference_title: "Portal 2".to_string(),
        }
    }

    fn hit(name: &str) -> ProviderCandidate {
        ProviderCandidate {
            external_id: 1,
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reachable_provider_is_ok() {
        let mut client = MockProviderClient::new();
        client
            .expect_search()
            .with(eq("a"))
            .times(1)
            .returning(|_| Ok(vec![hit("Anno 1800")]));
        client
            .expect_search()
            .with(eq("Portal 2"))
            .times(1)
            .returning(|_| Ok(vec![hit("Portal 2")]));
        client.expect_details().never();

        let result = preflight(&client, &checks()).await;
        assert!(result.ok);
        assert_eq!(result.classification, PreflightClassification::Ok);
    }

    #[tokio::test]
    async fn test_blocked_liveness_short_circuits() {
        let mut client = MockProviderClient::new();
        client.expect_search().with(eq("a")).times(1).returning(|_| {
            Err(ProviderError::Blocked {
                status: 403,
                message: "origin not allowed".to_string(),
            })
        });
        client.expect_search().with(eq("Portal 2")).never();

        let result = preflight(&client, &checks()).await;
        assert!(!result.ok);
        assert_eq!(result.classification, PreflightClassification::CrossOriginBlocked);
        assert!(!result.hint.is_empty());
    }

    #[tokio::test]
    async fn test_empty_reference_is_no_results() {
        let mut client = MockProviderClient::new();
        client
            .expect_search()
            .with(eq("a"))
            .returning(|_| Ok(vec![hit("Anno 1800")]));
        client
            .expect_search()
            .with(eq("Portal 2"))
            .times(1)
            .returning(|_| Ok(vec![]));

        let result = preflight(&client, &checks()).await;
        assert_eq!(result.classification, PreflightClassification::NoResults);
        assert!(result.detail.contains("Portal 2"));
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let mut client = MockProviderClient::new();
        client
            .expect_search()
            .returning(|_| Err(ProviderError::Timeout("15s elapsed".to_string())));

        let result = preflight(&client, &checks()).await;
        assert_eq!(result.classification, PreflightClassification::NetworkError);
    }

    #[test]
    fn test_classify_is_structural() {
        assert_eq!(
            classify(&ProviderError::Status { status: 500, message: String::new() }),
            PreflightClassification::NetworkError
        );
        assert_eq!(
            classify(&ProviderError::Decode("bad json".to_string())),
            PreflightClassification::NetworkError
        );
    }
}
