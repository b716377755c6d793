//! HTTP ticker feeds for the exchange venues

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use oracle_core::{Exchange, PriceFeedError, PriceFeedResult, SamplePair};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A venue that can report its traded volume and last price
#[async_trait]
pub trait ExchangeSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> PriceFeedResult<SamplePair>;
}

/// JSON pointers to the (volume, last price) fields of each venue's ticker
fn ticker_fields(exchange: Exchange) -> (&'static str, &'static str) {
    match exchange {
        Exchange::Gemini => ("/volume/ETH", "/last"),
        Exchange::Gdax => ("/volume", "/price"),
        Exchange::Bitfinex => ("/volume", "/last_price"),
        Exchange::Kraken => ("/result/XETHZUSD/v/1", "/result/XETHZUSD/c/0"),
    }
}

/// Extract a sample from a decoded ticker body
pub fn parse_ticker(exchange: Exchange, body: &Value) -> PriceFeedResult<SamplePair> {
    let (volume_field, price_field) = ticker_fields(exchange);
    let weight = read_number(exchange, body, volume_field)?;
    let price = read_number(exchange, body, price_field)?;

    SamplePair::new(weight, price)
}

// Venues quote numbers as JSON strings; accept plain numbers too.
fn read_number(exchange: Exchange, body: &Value, pointer: &str) -> PriceFeedResult<f64> {
    let malformed = |reason: String| PriceFeedError::MalformedResponse {
        venue: exchange.name(),
        reason,
    };

    match body.pointer(pointer) {
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| malformed(format!("{pointer}: {e}"))),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| malformed(format!("{pointer}: not representable as f64"))),
        Some(other) => Err(malformed(format!("{pointer}: unexpected value {other}"))),
        None => Err(malformed(format!("{pointer}: missing"))),
    }
}

/// Polls a venue's public ticker endpoint
pub struct HttpTickerFeed {
    exchange: Exchange,
    client: reqwest::Client,
    url: String,
}

impl HttpTickerFeed {
    pub fn new(exchange: Exchange, client: reqwest::Client) -> Self {
        Self {
            exchange,
            client,
            url: exchange.ticker_url().to_string(),
        }
    }

    /// Point the feed at a different ticker endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }
}

#[async_trait]
impl ExchangeSource for HttpTickerFeed {
    fn name(&self) -> &str {
        self.exchange.name()
    }

    async fn fetch(&self) -> PriceFeedResult<SamplePair> {
        debug!("Fetching {} ticker from {}", self.exchange, self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PriceFeedError::Http(format!("{}: {}", self.exchange, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceFeedError::Http(format!(
                "{} returned status {}",
                self.exchange, status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PriceFeedError::MalformedResponse {
                venue: self.exchange.name(),
                reason: e.to_string(),
            })?;

        parse_ticker(self.exchange, &body)
    }
}

/// Shared HTTP client for all ticker feeds
pub fn http_client() -> PriceFeedResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("eth-usd-oracle/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PriceFeedError::Http(e.to_string()))
}

/// One feed per supported venue
pub fn default_sources(client: reqwest::Client) -> Vec<Arc<dyn ExchangeSource>> {
    Exchange::ALL
        .iter()
        .map(|exchange| {
            Arc::new(HttpTickerFeed::new(*exchange, client.clone())) as Arc<dyn ExchangeSource>
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_gemini() {
        let sample = parse_ticker(Exchange::Gemini, &fixtures::gemini()).unwrap();
        assert_eq!(sample.weight, 239180.16170535);
        assert_eq!(sample.price, 200.54);
    }

    #[test]
    fn test_parse_gdax() {
        let sample = parse_ticker(Exchange::Gdax, &fixtures::gdax()).unwrap();
        assert_eq!(sample.weight, 357403.99540574);
        assert_eq!(sample.price, 200.26);
    }

    #[test]
    fn test_parse_bitfinex() {
        let sample = parse_ticker(Exchange::Bitfinex, &fixtures::bitfinex()).unwrap();
        assert_eq!(sample.weight, 305417.86949845);
        assert_eq!(sample.price, 198.17);
    }

    #[test]
    fn test_parse_kraken() {
        let sample = parse_ticker(Exchange::Kraken, &fixtures::kraken()).unwrap();
        assert_eq!(sample.weight, 166726.78509865);
        assert_eq!(sample.price, 200.9995);
    }

    #[test]
    fn test_numeric_fields_accepted() {
        let body = json!({ "volume": 10.5, "price": 201 });
        let sample = parse_ticker(Exchange::Gdax, &body).unwrap();
        assert_eq!(sample.weight, 10.5);
        assert_eq!(sample.price, 201.0);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let body = json!({ "volume": "10" });
        let err = parse_ticker(Exchange::Gdax, &body).unwrap_err();
        assert!(matches!(err, PriceFeedError::MalformedResponse { venue: "gdax", .. }));
    }

    #[test]
    fn test_garbage_number_is_malformed() {
        let body = json!({ "volume": "lots", "price": "200" });
        assert!(parse_ticker(Exchange::Gdax, &body).is_err());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let body = json!({ "volume": "10", "last_price": "0" });
        let err = parse_ticker(Exchange::Bitfinex, &body).unwrap_err();
        assert!(matches!(err, PriceFeedError::InvalidSample(_)));
    }

    #[test]
    fn test_default_sources_cover_all_venues() {
        let sources = default_sources(reqwest::Client::new());
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["gemini", "gdax", "bitfinex", "kraken"]);
    }

    mod http {
        use super::*;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        /// Serve a single canned HTTP response, returning its URL
        async fn serve_once(status: &'static str, body: String) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}/ticker", listener.local_addr().unwrap());

            tokio::spawn(async move {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });

            url
        }

        fn feed(exchange: Exchange, url: String) -> HttpTickerFeed {
            HttpTickerFeed::new(exchange, http_client().unwrap()).with_url(url)
        }

        #[tokio::test]
        async fn test_fetch_parses_ticker() {
            let url = serve_once("200 OK", fixtures::kraken().to_string()).await;

            let sample = feed(Exchange::Kraken, url).fetch().await.unwrap();

            assert_eq!(sample.weight, 166726.78509865);
            assert_eq!(sample.price, 200.9995);
        }

        #[tokio::test]
        async fn test_fetch_rejects_error_status() {
            let url = serve_once("503 Service Unavailable", "{}".to_string()).await;

            let err = feed(Exchange::Gemini, url).fetch().await.unwrap_err();

            match err {
                PriceFeedError::Http(msg) => assert!(msg.contains("503")),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_fetch_rejects_malformed_body() {
            let url = serve_once("200 OK", "<html>maintenance</html>".to_string()).await;

            let err = feed(Exchange::Bitfinex, url).fetch().await.unwrap_err();

            assert!(matches!(
                err,
                PriceFeedError::MalformedResponse { venue: "bitfinex", .. }
            ));
        }
    }
}
