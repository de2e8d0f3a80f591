//! Per-query orchestration: trigger the search, scroll the results panel
//! to completion, recover the intercepted payloads and reduce them to a
//! deduplicated record set.

use std::time::Instant;

use tracing::warn;

use crate::config::{Config, MalformedItemPolicy};
use crate::dedup::ResultSet;
use crate::error::{CrawlError, MalformedItem};
use crate::extract;
use crate::netlog::{self, CapturedPayload};
use crate::scroll::ScrollController;
use crate::session::MapSession;
use crate::storage;

/// One (city, district, category) unit of work.
#[derive(Debug, Clone)]
pub struct Query {
    pub city: String,
    pub district: String,
    pub category: String,
}

impl Query {
    pub fn label(&self) -> String {
        format!("{} {} {}", self.city, self.district, self.category)
    }
}

pub struct MapCrawler {
    config: Config,
    scroll: ScrollController,
}

impl MapCrawler {
    pub fn new(config: Config) -> Self {
        let scroll = ScrollController::new(config.scroll.clone());
        Self { config, scroll }
    }

    /// Runs one query end to end in a fresh browser session and returns
    /// the deduplicated record set. The session is dropped (closing
    /// Chrome) before this returns, so queries share nothing.
    pub async fn run(&self, query: &Query) -> Result<ResultSet, CrawlError> {
        let session = MapSession::launch(&self.config)?;
        session.open_maps()?;
        session.submit_query(query).await?;

        if session.single_card_visible() {
            println!("🪧 Single result card rendered, skipping scroll");
        } else {
            let panel = session.results_panel()?;
            let termination = self.scroll.advance(&panel).await?;
            println!("🧭 Scroll converged: {:?}", termination);
        }

        let entries = session.drain_log();
        println!("📥 Captured {} traffic log entries", entries.len());

        let payloads = netlog::collect_payloads(&session, &entries);
        let advertised = payloads
            .iter()
            .map(|p| p.data.total_result_count)
            .max()
            .unwrap_or(0);
        println!(
            "📦 Recovered {} search payloads ({} results advertised)",
            payloads.len(),
            advertised
        );

        let results = build_result_set(&payloads, self.config.malformed_items)?;
        Ok(results)
    }

    /// Iterates the cartesian product of cities × districts × categories,
    /// persisting one file per combination. A failed query is diagnosed
    /// and skipped; the rest of the run is unaffected.
    pub async fn run_all(&self) {
        for city in &self.config.cities {
            for district in &self.config.districts {
                for category in &self.config.categories {
                    let query = Query {
                        city: city.clone(),
                        district: district.clone(),
                        category: category.clone(),
                    };
                    let started = Instant::now();
                    println!("🔎 Crawling: {}", query.label());

                    match self.run(&query).await {
                        Ok(results) => {
                            println!(
                                "✅ {} records for \"{}\" ({:.3}s)",
                                results.len(),
                                query.label(),
                                started.elapsed().as_secs_f64()
                            );
                            match storage::write_result_set(&self.config.data_dir, &query, &results)
                            {
                                Ok(path) => println!("💾 Saved {}", path.display()),
                                Err(e) => {
                                    eprintln!("⚠️ Failed to save \"{}\": {:#}", query.label(), e);
                                }
                            }
                        }
                        Err(e) => eprintln!("❌ Query \"{}\" failed: {}", query.label(), e),
                    }
                }
            }
        }
    }
}

/// Reduces payload pages to a deduplicated record set. Only items tagged
/// `business` reach the extractor; what happens to malformed ones is the
/// configured policy's call.
pub fn build_result_set(
    payloads: &[CapturedPayload],
    policy: MalformedItemPolicy,
) -> Result<ResultSet, MalformedItem> {
    let mut results = ResultSet::default();
    for payload in payloads {
        for item in payload.data.items.iter().filter(|item| item.is_business()) {
            match extract::extract(item) {
                Ok(record) => {
                    results.insert(record);
                }
                Err(err) => match policy {
                    MalformedItemPolicy::Abort => return Err(err),
                    MalformedItemPolicy::Skip => warn!("skipping business item: {err}"),
                },
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;
    use crate::netlog::{collect_payloads, CorrelationId, RawLogEntry, ResponseBodySource};
    use serde_json::json;
    use std::collections::HashMap;

    struct FakeBodySource(HashMap<String, String>);

    impl ResponseBodySource for FakeBodySource {
        fn response_body(&self, id: &CorrelationId) -> Result<String, ResolutionError> {
            self.0
                .get(&id.0)
                .cloned()
                .ok_or_else(|| ResolutionError::BodyUnavailable("body evicted".to_owned()))
        }
    }

    fn search_entry(request_id: &str) -> RawLogEntry {
        RawLogEntry {
            message: json!({
                "method": "Network.responseReceived",
                "params": {
                    "requestId": request_id,
                    "response": {"url": "https://yandex.ru/maps/api/search?text=q"},
                },
            })
            .to_string(),
        }
    }

    fn payloads_from(bodies: Vec<serde_json::Value>) -> Vec<CapturedPayload> {
        let entries: Vec<RawLogEntry> = (0..bodies.len())
            .map(|i| search_entry(&i.to_string()))
            .collect();
        let source = FakeBodySource(
            bodies
                .into_iter()
                .enumerate()
                .map(|(i, body)| (i.to_string(), body.to_string()))
                .collect(),
        );
        collect_payloads(&source, &entries)
    }

    #[test]
    fn duplicate_businesses_collapse_and_non_business_items_are_excluded() {
        let payloads = payloads_from(vec![json!({
            "data": {
                "totalResultCount": 2,
                "items": [
                    {"type": "business", "title": "A", "address": "X"},
                    {"type": "business", "title": "A", "address": "X"},
                    {"type": "other"}
                ]
            }
        })]);

        // Abort policy: the `other` item has no title or address, so this
        // passing also proves non-business items never reach extraction.
        let results = build_result_set(&payloads, MalformedItemPolicy::Abort).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.records()[0].title, "A");
        assert_eq!(results.records()[0].address, "X");
    }

    #[test]
    fn records_accumulate_across_payload_pages() {
        let page = |title: &str| {
            json!({
                "data": {
                    "totalResultCount": 2,
                    "items": [{"type": "business", "title": title, "address": "X"}]
                }
            })
        };
        let payloads = payloads_from(vec![page("A"), page("B"), page("A")]);

        let results = build_result_set(&payloads, MalformedItemPolicy::Skip).unwrap();
        let titles: Vec<&str> = results.records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn metro_hints_survive_the_whole_pipeline_in_order() {
        let payloads = payloads_from(vec![json!({
            "data": {
                "totalResultCount": 1,
                "items": [{
                    "type": "business",
                    "title": "A",
                    "address": "X",
                    "metro": [
                        {"name": "Station1", "distanceValue": 100},
                        {"name": "Station2", "distanceValue": 350}
                    ]
                }]
            }
        })]);

        let results = build_result_set(&payloads, MalformedItemPolicy::Abort).unwrap();
        let metro = results.records()[0].nearest_metro_stations.as_ref().unwrap();
        assert_eq!(metro.len(), 2);
        assert_eq!(metro[0].name, "Station1");
        assert_eq!(metro[0].distance, 100.into());
        assert_eq!(metro[1].name, "Station2");
    }

    #[test]
    fn skip_policy_drops_malformed_items_and_keeps_the_rest() {
        let payloads = payloads_from(vec![json!({
            "data": {
                "totalResultCount": 2,
                "items": [
                    {"type": "business", "title": "A"},
                    {"type": "business", "title": "B", "address": "Y"}
                ]
            }
        })]);

        let results = build_result_set(&payloads, MalformedItemPolicy::Skip).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.records()[0].title, "B");
    }

    #[test]
    fn abort_policy_fails_the_query_on_a_malformed_item() {
        let payloads = payloads_from(vec![json!({
            "data": {
                "totalResultCount": 1,
                "items": [{"type": "business", "title": "A"}]
            }
        })]);

        let err = build_result_set(&payloads, MalformedItemPolicy::Abort).unwrap_err();
        assert_eq!(err.field, "address");
    }

    #[test]
    fn unparsable_page_is_skipped_without_losing_the_others() {
        let source = FakeBodySource(
            [
                ("0".to_string(), "<html>gateway timeout</html>".to_string()),
                (
                    "1".to_string(),
                    json!({"data": {"totalResultCount": 1, "items": [
                        {"type": "business", "title": "A", "address": "X"}
                    ]}})
                    .to_string(),
                ),
            ]
            .into_iter()
            .collect(),
        );
        let entries = vec![search_entry("0"), search_entry("1")];

        let payloads = collect_payloads(&source, &entries);
        let results = build_result_set(&payloads, MalformedItemPolicy::Abort).unwrap();
        assert_eq!(results.len(), 1);
    }
}
