use crate::domain::model::{BenchOutput, Event, Measurement};
use crate::domain::ports::{BenchContext, Benchmark, NoSqlDatabase};
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::time::Instant;

const DEFAULT_TABLE: &str = "shopping_cart";

/// Shopping-cart CRUD over the NoSQL port. The event carries a list of
/// route-shaped requests; point reads are deferred and resolved together.
pub struct CrudApi;

fn body_str<'a>(body: &'a Value, field: &str) -> Result<&'a str> {
    body.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| BenchError::EventError {
            message: format!("CRUD request body is missing '{}'", field),
        })
}

fn cart_total(items: &[Map<String, Value>]) -> f64 {
    items
        .iter()
        .map(|item| {
            let price = item.get("price").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let quantity = item.get("quantity").and_then(|v| v.as_f64()).unwrap_or(1.0);
            price * quantity
        })
        .sum()
}

#[async_trait]
impl Benchmark for CrudApi {
    fn name(&self) -> &'static str {
        "crud-api"
    }

    async fn run(&self, event: &Event, ctx: &BenchContext) -> Result<BenchOutput> {
        let table = event.get_str("table").unwrap_or(DEFAULT_TABLE).to_string();
        let requests = event
            .get("requests")
            .and_then(|v| v.as_array())
            .ok_or_else(|| BenchError::EventError {
                message: "crud-api needs a 'requests' array".to_string(),
            })?;

        let compute_begin = Instant::now();
        let mut responses: Vec<Value> = vec![Value::Null; requests.len()];
        let mut deferred_gets = Vec::new();

        for (index, request) in requests.iter().enumerate() {
            let route = request
                .get("route")
                .and_then(|v| v.as_str())
                .ok_or_else(|| BenchError::EventError {
                    message: format!("CRUD request {} has no 'route'", index),
                })?;
            let empty = Value::Object(Map::new());
            let body = request.get("body").unwrap_or(&empty);

            match route {
                "PUT /cart" => {
                    let cart = body_str(body, "cart")?;
                    let product_id = body_str(body, "product_id")?;
                    let mut data = Map::new();
                    for field in ["name", "price", "quantity"] {
                        if let Some(value) = body.get(field) {
                            data.insert(field.to_string(), value.clone());
                        }
                    }
                    ctx.nosql
                        .insert(&table, ("cart_id", cart), ("product_id", product_id), data)
                        .await?;
                    responses[index] = json!({"status": "added", "product_id": product_id});
                }
                "GET /cart/{id}" => {
                    let cart = body_str(body, "cart")?.to_string();
                    let product_id = body_str(body, "product_id")?.to_string();
                    let nosql = ctx.nosql.clone();
                    let table = table.clone();
                    let handle = tokio::spawn(async move {
                        nosql
                            .get(&table, ("cart_id", &cart), ("product_id", &product_id))
                            .await
                    });
                    deferred_gets.push((index, handle));
                    // the lookup has to start here: a later delete in the
                    // request list must not be visible to it
                    tokio::task::yield_now().await;
                }
                "GET /cart" => {
                    let cart = body_str(body, "cart")?;
                    let items = ctx
                        .nosql
                        .query(&table, ("cart_id", cart), "product_id")
                        .await?;
                    let total = cart_total(&items);
                    responses[index] = json!({"products": items, "price": total});
                }
                "DELETE /cart/{id}" => {
                    let cart = body_str(body, "cart")?;
                    let product_id = body_str(body, "product_id")?;
                    ctx.nosql
                        .delete(&table, ("cart_id", cart), ("product_id", product_id))
                        .await?;
                    responses[index] = json!({"status": "deleted", "product_id": product_id});
                }
                other => {
                    return Err(BenchError::EventError {
                        message: format!("unknown CRUD route '{}'", other),
                    });
                }
            }
        }

        // Point reads only resolve together; each one was issued at its
        // position in the sequence. Pairing preserved by index.
        let gets = deferred_gets
            .into_iter()
            .map(|(index, handle)| async move { (index, handle.await) });
        for (index, joined) in join_all(gets).await {
            let item = joined.map_err(|e| BenchError::EventError {
                message: format!("cart lookup task failed: {}", e),
            })??;
            responses[index] = match item {
                Some(map) => Value::Object(map),
                None => Value::Null,
            };
        }

        let compute_time = compute_begin.elapsed().as_micros() as u64;

        Ok(BenchOutput::with_measurement(
            json!({
                "requests_processed": requests.len(),
                "responses": responses,
            }),
            Measurement {
                compute_time,
                ..Default::default()
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nosql::memory::MemoryDatabase;
    use crate::storage::local::LocalStorage;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_context(dir: &TempDir) -> BenchContext {
        BenchContext::new(
            Arc::new(LocalStorage::new(dir.path().join("storage"))),
            Arc::new(MemoryDatabase::new()),
            dir.path().join("scratch"),
        )
    }

    #[tokio::test]
    async fn test_crud_full_cycle() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);

        let event = Event::from_value(json!({
            "requests": [
                {"route": "PUT /cart", "body": {
                    "cart": "c1", "product_id": "p1", "name": "widget",
                    "price": 3.5, "quantity": 2
                }},
                {"route": "PUT /cart", "body": {
                    "cart": "c1", "product_id": "p2", "name": "gadget", "price": 10
                }},
                {"route": "GET /cart/{id}", "body": {"cart": "c1", "product_id": "p1"}},
                {"route": "GET /cart", "body": {"cart": "c1"}},
                {"route": "DELETE /cart/{id}", "body": {"cart": "c1", "product_id": "p1"}},
            ]
        }))
        .unwrap();

        let output = CrudApi.run(&event, &ctx).await.unwrap();
        let responses = output.result["responses"].as_array().unwrap();
        assert_eq!(responses.len(), 5);

        assert_eq!(responses[0]["status"], "added");
        assert_eq!(responses[2]["name"], "widget");
        assert_eq!(responses[3]["products"].as_array().unwrap().len(), 2);
        // 3.5 * 2 + 10 * 1
        assert_eq!(responses[3]["price"], 17.0);
        assert_eq!(responses[4]["status"], "deleted");

        // delete removed the item
        let remaining = ctx
            .nosql
            .query("shopping_cart", ("cart_id", "c1"), "product_id")
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_crud_concurrent_gets_keep_pairing() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);

        let mut requests = vec![];
        for i in 0..4 {
            requests.push(json!({"route": "PUT /cart", "body": {
                "cart": "c1", "product_id": format!("p{}", i), "name": format!("item{}", i),
                "price": i
            }}));
        }
        for i in (0..4).rev() {
            requests.push(json!({"route": "GET /cart/{id}", "body": {
                "cart": "c1", "product_id": format!("p{}", i)
            }}));
        }

        let event = Event::from_value(json!({"requests": requests})).unwrap();
        let output = CrudApi.run(&event, &ctx).await.unwrap();
        let responses = output.result["responses"].as_array().unwrap();

        // gets were issued in reverse order; each response matches its request
        for i in 0..4 {
            assert_eq!(responses[4 + i]["name"], format!("item{}", 3 - i));
        }
    }

    #[tokio::test]
    async fn test_crud_get_issued_before_delete_sees_item() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);

        let event = Event::from_value(json!({
            "requests": [
                {"route": "PUT /cart", "body": {
                    "cart": "c1", "product_id": "p1", "name": "widget", "price": 1
                }},
                {"route": "GET /cart/{id}", "body": {"cart": "c1", "product_id": "p1"}},
                {"route": "DELETE /cart/{id}", "body": {"cart": "c1", "product_id": "p1"}},
                {"route": "GET /cart/{id}", "body": {"cart": "c1", "product_id": "p1"}},
            ]
        }))
        .unwrap();

        let output = CrudApi.run(&event, &ctx).await.unwrap();
        let responses = output.result["responses"].as_array().unwrap();

        // the first get ran before the delete, the second after
        assert_eq!(responses[1]["name"], "widget");
        assert_eq!(responses[3], Value::Null);
    }

    #[tokio::test]
    async fn test_crud_unknown_route() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);

        let event = Event::from_value(json!({
            "requests": [{"route": "PATCH /cart", "body": {}}]
        }))
        .unwrap();

        assert!(CrudApi.run(&event, &ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_crud_get_missing_item_is_null() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);

        let event = Event::from_value(json!({
            "requests": [{"route": "GET /cart/{id}", "body": {"cart": "c1", "product_id": "p9"}}]
        }))
        .unwrap();

        let output = CrudApi.run(&event, &ctx).await.unwrap();
        assert_eq!(output.result["responses"][0], Value::Null);
    }
}
