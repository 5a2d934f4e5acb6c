use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Today's sentiment reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FearGreedReading {
    pub value: i32,
    pub classification: String,
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
}

// alternative.me sends the value as a string
#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: String,
    value_classification: String,
}

#[derive(Clone)]
pub struct FearGreedService {
    client: Client,
    url: String,
}

impl FearGreedService {
    pub fn new(url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, url }
    }

    pub async fn get_latest(
        &self,
    ) -> Result<FearGreedReading, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("limit", "1"), ("format", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("Fear & Greed API error: {}", response.status()).into());
        }

        let body: FearGreedResponse = response.json().await?;
        parse_reading(body)
    }
}

fn parse_reading(
    body: FearGreedResponse,
) -> Result<FearGreedReading, Box<dyn std::error::Error + Send + Sync>> {
    let entry = body
        .data
        .into_iter()
        .next()
        .ok_or("Fear & Greed response has no data")?;

    let value: i32 = entry
        .value
        .trim()
        .parse()
        .map_err(|e| format!("Invalid Fear & Greed value '{}': {}", entry.value, e))?;

    if !(0..=100).contains(&value) {
        return Err(format!("Fear & Greed value out of range: {}", value).into());
    }

    Ok(FearGreedReading {
        value,
        classification: entry.value_classification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<FearGreedReading, Box<dyn std::error::Error + Send + Sync>> {
        let body: FearGreedResponse = serde_json::from_str(json)?;
        parse_reading(body)
    }

    #[test]
    fn test_parse_reading() {
        let reading = parse(
            r#"{"name":"Fear and Greed Index","data":[{"value":"72","value_classification":"Greed","timestamp":"1718236800"}]}"#,
        )
        .unwrap();

        assert_eq!(reading.value, 72);
        assert_eq!(reading.classification, "Greed");
    }

    #[test]
    fn test_rejects_empty_and_out_of_range() {
        assert!(parse(r#"{"data":[]}"#).is_err());
        assert!(parse(r#"{"data":[{"value":"140","value_classification":"Greed"}]}"#).is_err());
        assert!(parse(r#"{"data":[{"value":"n/a","value_classification":"Greed"}]}"#).is_err());
    }
}
