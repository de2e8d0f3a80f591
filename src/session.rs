//! Browser session bootstrap and the collaborator surface the pipeline
//! consumes: navigation, query entry, panel access and CDP traffic capture.

use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, LaunchOptions, Tab};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde_json::json;
use tokio::time::sleep;

use crate::config::Config;
use crate::crawler::Query;
use crate::error::{CrawlError, ResolutionError};
use crate::netlog::{CorrelationId, RawLogEntry, ResponseBodySource};
use crate::scroll::ResultsPanel;

pub const MAPS_URL: &str = "https://yandex.ru/maps/";

const SEARCH_BAR_SELECTOR: &str = "input.input__control";
const SIDE_PANEL_SELECTOR: &str = ".search-list-view__content";
const BUSINESS_CARD_SELECTOR: &str = ".business-card-view__main-wrapper";
const END_OF_LIST_SELECTOR: &str = ".add-business-view";
const SEARCH_BUTTON_XPATH: &str = "//button[@type='submit' and @aria-haspopup='false']";

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    ]
});

/// One browser per query. Dropping the session closes Chrome, so no state
/// leaks between queries.
pub struct MapSession {
    _browser: Browser,
    tab: Arc<Tab>,
    log: Arc<Mutex<Vec<RawLogEntry>>>,
    wait_timeout: Duration,
}

impl MapSession {
    /// Launches Chrome, enables CDP network events and starts accumulating
    /// a traffic log of `Network.responseReceived` events.
    pub fn launch(config: &Config) -> Result<Self> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .unwrap_or(&USER_AGENTS[0]);

        let mut args = vec![
            OsStr::new("--disable-extensions"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--enable-logging"),
            OsStr::new("--log-level=0"),
        ];
        let ua_arg = format!("--user-agent={}", user_agent);
        args.push(OsStr::new(&ua_arg));
        if config.headless {
            // Use modern headless mode via args
            args.push(OsStr::new("--headless=new"));
        }

        let browser = Browser::new(LaunchOptions {
            headless: false,
            window_size: Some((1920, 1080)),
            args,
            ..Default::default()
        })?;

        let tab = browser.new_tab()?;

        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        // Bodies are fetched later, once scrolling has settled, so the
        // handler only records what arrived and under which request id.
        tab.register_response_handling(
            "traffic_log",
            Box::new(move |params, _fetch_body| {
                let message = json!({
                    "method": "Network.responseReceived",
                    "params": {
                        "requestId": params.request_id,
                        "response": {"url": params.response.url},
                    },
                })
                .to_string();
                if let Ok(mut entries) = sink.lock() {
                    entries.push(RawLogEntry { message });
                }
            }),
        )?;

        Ok(Self {
            _browser: browser,
            tab,
            log,
            wait_timeout: config.wait_timeout,
        })
    }

    /// Navigates to the map service and waits for the search bar.
    pub fn open_maps(&self) -> Result<(), CrawlError> {
        self.tab.navigate_to(MAPS_URL).map_err(CrawlError::Session)?;
        self.tab.wait_until_navigated().map_err(CrawlError::Session)?;
        self.wait_for(SEARCH_BAR_SELECTOR, "search bar")?;
        Ok(())
    }

    /// Enters the query the way a user would: "city district" first, then
    /// the category appended, each part submitted with Enter and followed
    /// by a bounded wait for the submit button to reappear.
    pub async fn submit_query(&self, query: &Query) -> Result<(), CrawlError> {
        let parts = [
            format!("{} {}", query.city, query.district),
            format!(" {}", query.category),
        ];

        for part in parts {
            let bar = self
                .tab
                .wait_for_element_with_custom_timeout(SEARCH_BAR_SELECTOR, self.wait_timeout)
                .map_err(|_| CrawlError::RetrievalTimeout {
                    what: "search bar",
                    timeout: self.wait_timeout,
                })?;
            bar.click().map_err(CrawlError::Session)?;
            self.tab.type_str(&part).map_err(CrawlError::Session)?;
            self.tab.press_key("Enter").map_err(CrawlError::Session)?;

            sleep(Duration::from_millis(
                1000 + (rand::random::<u64>() % 500),
            ))
            .await;

            self.tab
                .wait_for_xpath_with_custom_timeout(SEARCH_BUTTON_XPATH, self.wait_timeout)
                .map_err(|_| CrawlError::RetrievalTimeout {
                    what: "search submit button",
                    timeout: self.wait_timeout,
                })?;
        }
        Ok(())
    }

    /// A single business card means the search resolved to exactly one
    /// place; the results panel never renders and scrolling is pointless.
    pub fn single_card_visible(&self) -> bool {
        self.tab.find_element(BUSINESS_CARD_SELECTOR).is_ok()
    }

    /// Waits for the results panel and hands out a scrollable view of it.
    pub fn results_panel(&self) -> Result<SessionPanel<'_>, CrawlError> {
        self.wait_for(SIDE_PANEL_SELECTOR, "results side panel")?;
        Ok(SessionPanel { tab: &self.tab })
    }

    /// Takes the traffic log accumulated since launch.
    pub fn drain_log(&self) -> Vec<RawLogEntry> {
        self.log
            .lock()
            .map(|mut entries| entries.drain(..).collect())
            .unwrap_or_default()
    }

    fn wait_for(&self, selector: &str, what: &'static str) -> Result<(), CrawlError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, self.wait_timeout)
            .map(|_| ())
            .map_err(|_| CrawlError::RetrievalTimeout {
                what,
                timeout: self.wait_timeout,
            })
    }
}

impl ResponseBodySource for MapSession {
    fn response_body(&self, id: &CorrelationId) -> Result<String, ResolutionError> {
        let body = self
            .tab
            .call_method(Network::GetResponseBody {
                request_id: id.0.clone(),
            })
            .map_err(|e| ResolutionError::BodyUnavailable(e.to_string()))?;
        if body.base_64_encoded {
            // The search API serves JSON text; an encoded body is some
            // other resource that happened to match.
            return Err(ResolutionError::BodyUnavailable(
                "body is base64-encoded".to_owned(),
            ));
        }
        Ok(body.body)
    }
}

/// Scroll access to the results panel. The panel content itself grows as
/// pages load; the scrollable viewport is its nearest scroll container.
pub struct SessionPanel<'a> {
    tab: &'a Arc<Tab>,
}

impl ResultsPanel for SessionPanel<'_> {
    fn scroll_to(&self, offset: i64) -> Result<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('{SIDE_PANEL_SELECTOR}');
                if (!el) return false;
                const scroller = el.closest('.scroll__container') || el.parentElement || el;
                scroller.scrollTop = {offset};
                return true;
            }})()"#
        );
        self.tab.evaluate(&js, false)?;
        Ok(())
    }

    fn height(&self) -> Result<u64> {
        let js = format!(
            "(() => {{ const el = document.querySelector('{SIDE_PANEL_SELECTOR}'); return el ? el.offsetHeight : 0; }})()"
        );
        let result = self.tab.evaluate(&js, false)?;
        Ok(result.value.and_then(|v| v.as_f64()).unwrap_or(0.0) as u64)
    }

    fn end_marker_visible(&self) -> Result<bool> {
        let js = format!("document.querySelector('{END_OF_LIST_SELECTOR}') !== null");
        let result = self.tab.evaluate(&js, false)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}
