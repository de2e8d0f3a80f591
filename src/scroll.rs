//! Incremental-scroll convergence for the results side panel.
//!
//! The panel lazy-loads result pages as it is scrolled. Each iteration
//! requests a strictly larger absolute offset, waits a settle interval for
//! content to render, then re-reads the panel height. Termination is either
//! the explicit end-of-list marker (only rendered after the last page) or
//! height stagnation over K consecutive iterations. An optional hard cap
//! bounds degenerate panels that keep growing forever.

use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

/// Scrollable results panel, as much of it as the loop needs. The live
/// implementation drives the browser; tests script heights directly.
pub trait ResultsPanel {
    /// Scrolls the panel viewport to an absolute offset.
    fn scroll_to(&self, offset: i64) -> Result<()>;
    /// Rendered height of the results content.
    fn height(&self) -> Result<u64>;
    /// Whether the end-of-list sentinel element has rendered.
    fn end_marker_visible(&self) -> Result<bool>;
}

/// How the scroll loop ended. There is no failure variant: absence of the
/// marker degrades to the stagnation heuristic, which always converges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// End-of-list marker observed.
    Terminal,
    /// Panel height unchanged for the configured number of iterations.
    Stable,
    /// Hard iteration cap reached before either signal.
    Capped,
}

#[derive(Debug, Clone)]
pub struct ScrollConfig {
    /// Offset growth per iteration; later scrolls always request further.
    pub step: i64,
    /// Pause after each scroll so lazy-loaded content can render.
    pub settle: Duration,
    /// Consecutive unchanged-height iterations treated as exhaustion.
    pub stagnation_threshold: u32,
    /// Optional hard cap on iterations. None matches the original
    /// heuristic-only behavior.
    pub max_iterations: Option<u32>,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step: 2000,
            settle: Duration::from_millis(500),
            stagnation_threshold: 15,
            max_iterations: None,
        }
    }
}

pub struct ScrollController {
    config: ScrollConfig,
}

impl ScrollController {
    pub fn new(config: ScrollConfig) -> Self {
        Self { config }
    }

    /// Drives the panel until result loading is complete.
    ///
    /// Any height change resets the stagnation counter, so `Stable` is only
    /// reported after `stagnation_threshold` consecutive quiet iterations.
    pub async fn advance(&self, panel: &dyn ResultsPanel) -> Result<Termination> {
        let mut offset = self.config.step;
        let mut last_height = panel.height()?;
        let mut stagnant: u32 = 0;
        let mut iterations: u32 = 0;

        loop {
            if panel.end_marker_visible()? {
                return Ok(Termination::Terminal);
            }
            if stagnant >= self.config.stagnation_threshold {
                return Ok(Termination::Stable);
            }
            if let Some(cap) = self.config.max_iterations {
                if iterations >= cap {
                    return Ok(Termination::Capped);
                }
            }

            panel.scroll_to(offset)?;
            sleep(self.config.settle).await;
            offset += self.config.step;
            iterations += 1;

            let height = panel.height()?;
            if height == last_height {
                stagnant += 1;
            } else {
                stagnant = 0;
                last_height = height;
            }
        }
    }
}
