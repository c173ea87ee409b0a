use crate::utils::error::{BenchError, Result};
use crate::utils::validation::validate_bucket_name;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One benchmark invocation's parameters. Built by the platform entrypoint
/// from the JSON request body merged with URL query parameters, plus the
/// `request-id` and `income-timestamp` fields injected by the wrapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event(pub Map<String, Value>);

impl Event {
    pub fn new() -> Self {
        Event(Map::new())
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Event(map)),
            Value::Null => Ok(Event::new()),
            other => Err(BenchError::EventError {
                message: format!("event must be a JSON object, got {}", other),
            }),
        }
    }

    /// Parses the body (if any) and merges URL query parameters on top.
    /// Query values that parse as integers become numbers, matching what
    /// the benchmark driver sends when it switches to GET invocation.
    pub fn from_request(body: &str, query: &str) -> Result<Self> {
        let mut event = if body.trim().is_empty() {
            Event::new()
        } else {
            Event::from_value(serde_json::from_str(body)?)?
        };
        event.merge_query(query);
        Ok(event)
    }

    pub fn merge_query(&mut self, query: &str) {
        for chunk in query.split('&').filter(|c| !c.is_empty()) {
            let mut parts = chunk.splitn(2, '=');
            let key = match parts.next() {
                Some(k) if !k.is_empty() => k,
                _ => continue,
            };
            let value = match parts.next() {
                Some(v) => match v.parse::<i64>() {
                    Ok(n) => Value::Number(n.into()),
                    Err(_) => Value::String(v.to_string()),
                },
                None => Value::Null,
            };
            self.0.insert(key.to_string(), value);
        }
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(|v| v.as_u64())
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key).ok_or_else(|| BenchError::EventError {
            message: format!("missing string field '{}'", key),
        })
    }

    fn nested_str(&self, outer: &str, inner: &str) -> Result<&str> {
        self.0
            .get(outer)
            .and_then(|v| v.get(inner))
            .and_then(|v| v.as_str())
            .ok_or_else(|| BenchError::EventError {
                message: format!("missing field '{}.{}'", outer, inner),
            })
    }

    /// The recurring `bucket` descriptor: target bucket plus input/output
    /// key prefixes.
    pub fn bucket(&self) -> Result<BucketDescriptor> {
        let name = self.nested_str("bucket", "bucket")?;
        validate_bucket_name("bucket.bucket", name)?;
        Ok(BucketDescriptor {
            bucket: name.to_string(),
            input: self
                .0
                .get("bucket")
                .and_then(|v| v.get("input"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            output: self
                .0
                .get("bucket")
                .and_then(|v| v.get("output"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }

    /// The recurring `object` descriptor: a key within the bucket, or a URL
    /// to fetch, with an optional size hint.
    pub fn object(&self) -> Result<ObjectDescriptor> {
        let obj = self.0.get("object").ok_or_else(|| BenchError::EventError {
            message: "missing field 'object'".to_string(),
        })?;
        Ok(ObjectDescriptor {
            key: obj.get("key").and_then(|v| v.as_str()).map(str::to_string),
            url: obj.get("url").and_then(|v| v.as_str()).map(str::to_string),
            size: obj.get("size").and_then(|v| v.as_u64()),
        })
    }

    pub fn request_id(&self) -> Option<&str> {
        self.get_str("request-id")
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketDescriptor {
    pub bucket: String,
    pub input: Option<String>,
    pub output: Option<String>,
}

impl BucketDescriptor {
    pub fn output_prefix(&self) -> &str {
        self.output.as_deref().unwrap_or("")
    }

    pub fn input_prefix(&self) -> &str {
        self.input.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDescriptor {
    pub key: Option<String>,
    pub url: Option<String>,
    pub size: Option<u64>,
}

/// Phase timings in microseconds plus transferred sizes in bytes.
/// Each field is filled in right after its phase completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    #[serde(default)]
    pub download_time: u64,
    #[serde(default)]
    pub download_size: u64,
    #[serde(default)]
    pub compute_time: u64,
    #[serde(default)]
    pub upload_time: u64,
    #[serde(default)]
    pub upload_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage_mb: Option<u64>,
}

/// What a benchmark hands back to the wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchOutput {
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<Measurement>,
}

impl BenchOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            measurement: None,
        }
    }

    pub fn with_measurement(result: Value, measurement: Measurement) -> Self {
        Self {
            result,
            measurement: Some(measurement),
        }
    }
}

/// The `result` block of a response: benchmark output plus its measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogData {
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<Measurement>,
}

/// The JSON shape every platform entrypoint replies with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub begin: String,
    pub end: String,
    pub results_time: String,
    pub result: LogData,
    pub is_cold: bool,
    pub container_id: String,
    pub request_id: String,
}

/// Error replies carry the same envelope with an `error` field instead of
/// a result, and go out as HTTP 500.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub is_cold: bool,
    pub container_id: String,
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_from_request_merges_query_over_body() {
        let body = r#"{"size": 1, "name": "from-body"}"#;
        let event = Event::from_request(body, "size=1024&label=abc").unwrap();

        assert_eq!(event.get_u64("size"), Some(1024));
        assert_eq!(event.get_str("label"), Some("abc"));
        assert_eq!(event.get_str("name"), Some("from-body"));
    }

    #[test]
    fn test_event_query_int_parsing() {
        let event = Event::from_request("", "repetitions=20&server-address=10.0.0.1").unwrap();
        assert_eq!(event.get_u64("repetitions"), Some(20));
        assert_eq!(event.get_str("server-address"), Some("10.0.0.1"));
    }

    #[test]
    fn test_event_rejects_non_object_body() {
        assert!(Event::from_request("[1,2,3]", "").is_err());
    }

    #[test]
    fn test_bucket_descriptor() {
        let event = Event::from_value(json!({
            "bucket": {"bucket": "bench-data", "output": "out", "input": "in"}
        }))
        .unwrap();
        let bucket = event.bucket().unwrap();
        assert_eq!(bucket.bucket, "bench-data");
        assert_eq!(bucket.output_prefix(), "out");
        assert_eq!(bucket.input_prefix(), "in");
    }

    #[test]
    fn test_bucket_descriptor_missing() {
        let event = Event::from_value(json!({"object": {"url": "http://x"}})).unwrap();
        assert!(event.bucket().is_err());
    }

    #[test]
    fn test_bucket_descriptor_rejects_invalid_name() {
        let event = Event::from_value(json!({"bucket": {"bucket": "Not-Valid!"}})).unwrap();
        assert!(event.bucket().is_err());

        let event = Event::from_value(json!({"bucket": {"bucket": "xy"}})).unwrap();
        assert!(event.bucket().is_err());
    }

    #[test]
    fn test_object_descriptor() {
        let event = Event::from_value(json!({
            "object": {"url": "https://example.com/f.bin", "size": 42}
        }))
        .unwrap();
        let object = event.object().unwrap();
        assert_eq!(object.url.as_deref(), Some("https://example.com/f.bin"));
        assert_eq!(object.size, Some(42));
        assert_eq!(object.key, None);
    }
}
