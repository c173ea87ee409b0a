use crate::domain::ports::{KeyAttribute, NoSqlDatabase};
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

/// Durable Object access for containerized deployments, proxied through the
/// fronting Worker's `/nosql/{operation}` routes.
#[derive(Debug, Clone)]
pub struct ProxyDatabase {
    client: Client,
    worker_url: String,
}

impl ProxyDatabase {
    pub fn new(worker_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            worker_url: worker_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn call(&self, operation: &str, table: &str, params: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/nosql/{}", self.worker_url, operation))
            .json(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| format!("{}: {}", status, body));
            return Err(BenchError::NoSqlError {
                operation: operation.to_string(),
                table: table.to_string(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    fn key_params(
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
    ) -> Value {
        json!({
            "table_name": table,
            "primary_key": [primary_key.0, primary_key.1],
            "secondary_key": [secondary_key.0, secondary_key.1],
        })
    }
}

#[async_trait]
impl NoSqlDatabase for ProxyDatabase {
    async fn insert(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
        data: Map<String, Value>,
    ) -> Result<()> {
        let mut params = Self::key_params(table, primary_key, secondary_key);
        params["data"] = Value::Object(data);
        self.call("insert", table, params).await?;
        Ok(())
    }

    async fn get(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
    ) -> Result<Option<Map<String, Value>>> {
        let params = Self::key_params(table, primary_key, secondary_key);
        let reply = self.call("get", table, params).await?;
        match reply.get("data") {
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            _ => Ok(None),
        }
    }

    async fn update(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
        data: Map<String, Value>,
    ) -> Result<()> {
        let mut params = Self::key_params(table, primary_key, secondary_key);
        params["data"] = Value::Object(data);
        self.call("update", table, params).await?;
        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key_name: &str,
    ) -> Result<Vec<Map<String, Value>>> {
        let params = json!({
            "table_name": table,
            "primary_key": [primary_key.0, primary_key.1],
            "secondary_key_name": secondary_key_name,
        });
        let reply = self.call("query", table, params).await?;
        let items = reply
            .get("items")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(items)
    }

    async fn delete(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
    ) -> Result<()> {
        let params = Self::key_params(table, primary_key, secondary_key);
        self.call("delete", table, params).await?;
        Ok(())
    }
}
