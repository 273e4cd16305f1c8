//! CloudWatch Logs store

use async_trait::async_trait;
use logprobe_client::{CloudWatchClient, Result};
use logprobe_core::domain::{LogGroup, LogStream};

use super::{Backend, GroupLookup, LogStore};

/// [`LogStore`] over CloudWatch log groups and streams
#[derive(Debug, Clone)]
pub struct CloudWatchStore {
    client: CloudWatchClient,
}

impl CloudWatchStore {
    pub fn new(client: CloudWatchClient) -> Self {
        Self { client }
    }
}

/// Stream name prefix shared by every stream a node emits
fn node_prefix(node: &str) -> String {
    format!("{}.", node)
}

#[async_trait]
impl LogStore for CloudWatchStore {
    fn backend(&self) -> Backend {
        Backend::CloudWatch
    }

    async fn list_groups(&self, lookup: &GroupLookup) -> Result<Vec<LogGroup>> {
        let scope = lookup.key.scope();
        let groups = self.client.describe_log_groups(&lookup.name).await?;

        Ok(groups
            .into_iter()
            .map(|summary| LogGroup {
                name: summary.log_group_name,
                category: lookup.category,
                scope_key: scope.clone(),
            })
            .collect())
    }

    async fn list_streams(&self, group: &LogGroup, node: Option<&str>) -> Result<Vec<LogStream>> {
        let prefix = node.map(node_prefix);
        let streams = self
            .client
            .describe_log_streams(&group.name, prefix.as_deref())
            .await?;

        Ok(streams
            .into_iter()
            .map(|summary| LogStream::from_cloudwatch_name(summary.log_stream_name))
            .collect())
    }
}
