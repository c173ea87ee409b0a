use crate::domain::ports::{KeyAttribute, NoSqlDatabase};
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// In-memory NoSQL table, partitioned by primary key value with items
/// ordered by secondary key value inside a partition. Backs the CLI driver
/// and the container server's Durable Object polyfill routes.
///
/// Items carry their key attributes, the same convention DynamoDB and the
/// Durable Object wrapper use.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: DashMap<String, DashMap<String, BTreeMap<String, Map<String, Value>>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_item(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
        mut data: Map<String, Value>,
    ) {
        data.insert(
            primary_key.0.to_string(),
            Value::String(primary_key.1.to_string()),
        );
        data.insert(
            secondary_key.0.to_string(),
            Value::String(secondary_key.1.to_string()),
        );

        let partitions = self.tables.entry(table.to_string()).or_default();
        partitions
            .entry(primary_key.1.to_string())
            .or_default()
            .insert(secondary_key.1.to_string(), data);
    }
}

#[async_trait]
impl NoSqlDatabase for MemoryDatabase {
    async fn insert(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
        data: Map<String, Value>,
    ) -> Result<()> {
        self.write_item(table, primary_key, secondary_key, data);
        Ok(())
    }

    async fn get(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
    ) -> Result<Option<Map<String, Value>>> {
        let Some(partitions) = self.tables.get(table) else {
            return Ok(None);
        };
        let Some(partition) = partitions.get(primary_key.1) else {
            return Ok(None);
        };
        Ok(partition.get(secondary_key.1).cloned())
    }

    async fn update(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
        data: Map<String, Value>,
    ) -> Result<()> {
        // Same put semantics as the Durable Object wrapper: update is an
        // unconditional overwrite.
        self.write_item(table, primary_key, secondary_key, data);
        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key_name: &str,
    ) -> Result<Vec<Map<String, Value>>> {
        let Some(partitions) = self.tables.get(table) else {
            return Err(BenchError::NoSqlError {
                operation: "query".to_string(),
                table: table.to_string(),
                message: "table does not exist".to_string(),
            });
        };
        let Some(partition) = partitions.get(primary_key.1) else {
            return Ok(Vec::new());
        };
        Ok(partition
            .values()
            .filter(|item| item.contains_key(secondary_key_name))
            .cloned()
            .collect())
    }

    async fn delete(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
    ) -> Result<()> {
        if let Some(partitions) = self.tables.get(table) {
            if let Some(mut partition) = partitions.get_mut(primary_key.1) {
                partition.remove(secondary_key.1);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(price: u64) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("price".to_string(), json!(price));
        data
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let db = MemoryDatabase::new();
        db.insert("carts", ("cart_id", "c1"), ("product_id", "p1"), item(10))
            .await
            .unwrap();

        let found = db
            .get("carts", ("cart_id", "c1"), ("product_id", "p1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("price"), Some(&json!(10)));
        // key attributes are written back into the item
        assert_eq!(found.get("cart_id"), Some(&json!("c1")));
        assert_eq!(found.get("product_id"), Some(&json!("p1")));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let db = MemoryDatabase::new();
        assert!(db
            .get("carts", ("cart_id", "c1"), ("product_id", "p1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let db = MemoryDatabase::new();
        db.insert("carts", ("cart_id", "c1"), ("product_id", "p1"), item(10))
            .await
            .unwrap();
        db.update("carts", ("cart_id", "c1"), ("product_id", "p1"), item(25))
            .await
            .unwrap();

        let found = db
            .get("carts", ("cart_id", "c1"), ("product_id", "p1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("price"), Some(&json!(25)));
    }

    #[tokio::test]
    async fn test_query_stays_inside_partition() {
        let db = MemoryDatabase::new();
        db.insert("carts", ("cart_id", "c1"), ("product_id", "p1"), item(1))
            .await
            .unwrap();
        db.insert("carts", ("cart_id", "c1"), ("product_id", "p2"), item(2))
            .await
            .unwrap();
        db.insert("carts", ("cart_id", "c2"), ("product_id", "p3"), item(3))
            .await
            .unwrap();

        let items = db
            .query("carts", ("cart_id", "c1"), "product_id")
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.get("cart_id") == Some(&json!("c1"))));
    }

    #[tokio::test]
    async fn test_query_unknown_table_errors() {
        let db = MemoryDatabase::new();
        assert!(db
            .query("nope", ("cart_id", "c1"), "product_id")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = MemoryDatabase::new();
        db.insert("carts", ("cart_id", "c1"), ("product_id", "p1"), item(1))
            .await
            .unwrap();
        db.delete("carts", ("cart_id", "c1"), ("product_id", "p1"))
            .await
            .unwrap();
        assert!(db
            .get("carts", ("cart_id", "c1"), ("product_id", "p1"))
            .await
            .unwrap()
            .is_none());
    }
}
