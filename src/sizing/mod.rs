//! Adaptive font sizing.
//!
//! Text components get the largest font size that fits their container,
//! found by binary search over integer sizes with no hardcoded minimum or
//! maximum caps. Role hints (title vs body) never alter the search; they
//! only travel along as metadata on the component.

mod metrics;

pub use metrics::FontMetricsService;

// =============================================================================
// Fit Result
// =============================================================================

/// Outcome of one sizing search.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// The chosen size; the largest that fits, or 1.0 if nothing fits.
    pub font_size: f64,
    /// Binary-search probes performed.
    pub iterations: u32,
    /// Wrapped line count at the chosen size.
    pub estimated_lines: usize,
    /// 0.75..=1.0 when the fit boundary was pinned to within one pixel,
    /// lower when the search ended without a fitting size.
    pub confidence: f64,
}

// =============================================================================
// Adaptive Font Sizer
// =============================================================================

/// Container-fit binary search over font sizes.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveFontSizer {
    metrics: FontMetricsService,
}

impl AdaptiveFontSizer {
    pub fn new() -> Self {
        Self {
            metrics: FontMetricsService::new(),
        }
    }

    /// Find the largest font size where `text` fits a `width` x `height`
    /// container with the given padding on each side.
    ///
    /// A size `S` fits iff the wrapped line count times `line_height(S)`
    /// stays within the padded height and no wrapped line overflows the
    /// padded width.
    pub fn find_optimal_size(
        &self,
        text: &str,
        width: f64,
        height: f64,
        font_family: &str,
        padding_x: f64,
        padding_y: f64,
    ) -> FitResult {
        let avail_width = width - 2.0 * padding_x;
        let avail_height = height - 2.0 * padding_y;

        if text.is_empty() || avail_width <= 0.0 || avail_height <= 0.0 {
            return FitResult {
                font_size: 1.0,
                iterations: 1,
                estimated_lines: if text.is_empty() { 0 } else { 1 },
                confidence: 0.3,
            };
        }

        let mut lo: u32 = 1;
        let mut hi: u32 = width.max(height).max(1.0) as u32;
        let mut best: Option<u32> = None;
        let mut iterations: u32 = 0;

        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            iterations += 1;
            if self.fits(text, mid as f64, avail_width, avail_height, font_family) {
                best = Some(mid);
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }

        match best {
            Some(size) => {
                let estimated_lines = self.metrics.estimate_lines(
                    text,
                    size as f64,
                    avail_width,
                    font_family,
                    "normal",
                );
                // Integer search pins the fit/non-fit boundary to one pixel;
                // longer searches get slightly less credit.
                let confidence = (1.0 - 0.01 * iterations as f64).clamp(0.75, 1.0);
                FitResult {
                    font_size: size as f64,
                    iterations,
                    estimated_lines,
                    confidence,
                }
            }
            None => FitResult {
                font_size: 1.0,
                iterations: iterations.max(1),
                estimated_lines: self.metrics.estimate_lines(
                    text,
                    1.0,
                    avail_width,
                    font_family,
                    "normal",
                ),
                confidence: 0.3,
            },
        }
    }

    fn fits(
        &self,
        text: &str,
        font_size: f64,
        avail_width: f64,
        avail_height: f64,
        family: &str,
    ) -> bool {
        let lines = self
            .metrics
            .wrap_lines(text, font_size, avail_width, family, "normal");

        let total_height = lines.len() as f64 * self.metrics.line_height(font_size);
        if total_height > avail_height {
            return false;
        }
        lines
            .iter()
            .all(|line| self.metrics.measure_width(line, font_size, family, "normal") <= avail_width)
    }
}

// =============================================================================
// Tests
// =============================================================================
