// Connector trait and the test stub.
//
// Every source implements Connector. fetch() returns a ConnectorResult even
// on partial failure; only setup-level errors (bad client, no network stack)
// surface as Err, and the collector downgrades those to an unavailable
// result rather than aborting the run.

use anyhow::Result;
use async_trait::async_trait;

use pulsewatch_common::types::{ConnectorResult, SourceStatus, TrendItem};

#[async_trait]
pub trait Connector: Send + Sync {
    /// Stable source name, used as TrendItem.source and in run reports.
    fn name(&self) -> &str;

    /// Whether this source needs an API credential to return data.
    fn requires_auth(&self) -> bool {
        false
    }

    /// Fetch raw trend items for the given markets and keywords.
    async fn fetch(&self, markets: &[String], keywords: &[String]) -> Result<ConnectorResult>;

    /// Cheap reachability probe, used for diagnostics only.
    async fn health_check(&self) -> bool;
}

// ---------------------------------------------------------------------------
// StubConnector — canned results for pipeline tests
// ---------------------------------------------------------------------------

/// Connector that returns a fixed set of items. Lets pipeline tests run the
/// full six stages without network access.
pub struct StubConnector {
    name: &'static str,
    items: Vec<TrendItem>,
    fail: bool,
}

impl StubConnector {
    pub fn new(name: &'static str, items: Vec<TrendItem>) -> Self {
        Self {
            name,
            items,
            fail: false,
        }
    }

    /// A stub whose fetch always errors, for failure-isolation tests.
    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            items: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl Connector for StubConnector {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, _markets: &[String], _keywords: &[String]) -> Result<ConnectorResult> {
        if self.fail {
            anyhow::bail!("stub connector '{}' configured to fail", self.name);
        }
        let mut result = ConnectorResult::new(self.name, SourceStatus::Active);
        result.items = self.items.clone();
        result.completed_at = chrono::Utc::now();
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        !self.fail
    }
}

// ---------------------------------------------------------------------------
// UnsupportedConnector — placeholder for sources without an implementation
// ---------------------------------------------------------------------------

/// Connector for sources that are enabled in config but have no
/// implementation in this build (twitter, tiktok, instagram). Always
/// reports unavailable so the gap shows up in run reports instead of
/// silently disappearing.
pub struct UnsupportedConnector {
    name: String,
}

impl UnsupportedConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Connector for UnsupportedConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _markets: &[String], _keywords: &[String]) -> Result<ConnectorResult> {
        let mut result = ConnectorResult::new(&self.name, SourceStatus::Unavailable);
        result
            .warnings
            .push(format!("No connector implemented for source '{}'", self.name));
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        false
    }
}
