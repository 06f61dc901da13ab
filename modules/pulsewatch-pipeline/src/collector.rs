//! Collection stage: runs every connector concurrently and gathers their
//! results. A connector failure becomes an unavailable result; it never
//! aborts the run.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{info, warn};

use pulsewatch_common::types::{ConnectorResult, TrendItem};
use pulsewatch_connectors::Connector;

pub struct Collector {
    connectors: Vec<Box<dyn Connector>>,
}

impl Collector {
    pub fn new(connectors: Vec<Box<dyn Connector>>) -> Self {
        Self { connectors }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.connectors.iter().map(|c| c.name()).collect()
    }

    /// Fetch from all connectors concurrently.
    pub async fn collect_all(
        &self,
        markets: &[String],
        keywords: &[String],
    ) -> Vec<ConnectorResult> {
        info!(
            connectors = self.connectors.len(),
            markets = markets.len(),
            keyword_count = keywords.len(),
            "Collection starting"
        );

        let fetches = self
            .connectors
            .iter()
            .map(|connector| connector.fetch(markets, keywords));
        let outcomes = join_all(fetches).await;

        let mut results = Vec::with_capacity(self.connectors.len());
        for (connector, outcome) in self.connectors.iter().zip(outcomes) {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    warn!(source = connector.name(), error = %e, "Connector failed");
                    ConnectorResult::unavailable(connector.name(), e.to_string())
                }
            };
            info!(
                source = %result.source,
                status = %result.status,
                items = result.item_count(),
                errors = result.errors.len(),
                duration_seconds = result.duration_seconds(),
                "Source collected"
            );
            results.push(result);
        }
        results
    }

    /// Probe each connector, for diagnostics.
    pub async fn health_check_all(&self) -> BTreeMap<String, bool> {
        let checks = self.connectors.iter().map(|c| c.health_check());
        let outcomes = join_all(checks).await;
        self.connectors
            .iter()
            .zip(outcomes)
            .map(|(c, healthy)| (c.name().to_string(), healthy))
            .collect()
    }
}

/// Flatten successful results into one item batch.
pub fn merge_items(results: &[ConnectorResult]) -> Vec<TrendItem> {
    results
        .iter()
        .flat_map(|result| result.items.iter().cloned())
        .collect()
}

/// Sources that produced a usable result.
pub fn successful_sources(results: &[ConnectorResult]) -> usize {
    results.iter().filter(|r| r.success()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsewatch_common::types::SourceStatus;
    use pulsewatch_connectors::StubConnector;

    #[tokio::test]
    async fn failing_connector_becomes_unavailable_result() {
        let items = vec![TrendItem::new("reddit", "A fine trend", None)];
        let collector = Collector::new(vec![
            Box::new(StubConnector::new("reddit", items)),
            Box::new(StubConnector::failing("news_rss")),
        ]);

        let results = collector.collect_all(&[], &[]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, SourceStatus::Active);
        assert_eq!(results[1].status, SourceStatus::Unavailable);
        assert!(!results[1].errors.is_empty());

        assert_eq!(merge_items(&results).len(), 1);
        assert_eq!(successful_sources(&results), 1);
    }

    #[tokio::test]
    async fn health_check_reports_per_source() {
        let collector = Collector::new(vec![
            Box::new(StubConnector::new("reddit", vec![])),
            Box::new(StubConnector::failing("news_rss")),
        ]);
        let health = collector.health_check_all().await;
        assert_eq!(health["reddit"], true);
        assert_eq!(health["news_rss"], false);
    }
}
