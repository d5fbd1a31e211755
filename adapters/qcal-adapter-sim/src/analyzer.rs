//! Peak-finding analyzer for simulated datasets.

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use tracing::debug;

use qcal_sweep::{AnalysisContext, Analyzer, CollaboratorError, CollaboratorResult, DataArray, Dataset, Qoi};
use qcal_types::Component;

use crate::scan_axis;

/// Locates the peak along the scan axis of a unit's first data array.
///
/// The first declared field receives the coordinate of the peak, every other
/// field the mean magnitude at the peak.
#[derive(Debug, Default)]
pub struct PeakAnalyzer {
    failing: FxHashSet<Component>,
    omitted: FxHashSet<String>,
}

impl PeakAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the fit fail for units involving these components.
    pub fn failing_on(mut self, components: impl IntoIterator<Item = Component>) -> Self {
        self.failing.extend(components);
        self
    }

    /// Never report these fields.
    pub fn omitting(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.omitted.extend(fields.into_iter().map(Into::into));
        self
    }

    fn unit_array<'a>(&self, dataset: &'a Dataset, ctx: &AnalysisContext) -> Option<&'a DataArray> {
        let unit = &ctx.unit;
        dataset
            .iter()
            .map(|(_, array)| array)
            .find(|a| a.component == unit.component || unit.members.contains(&a.component))
    }
}

/// Coordinate value and mean magnitude at the peak of the scan axis.
fn locate_peak(array: &DataArray) -> Option<(f64, f64)> {
    let names: Vec<&str> = array.coords.iter().map(|c| c.name.as_str()).collect();
    let magnitudes = array.magnitudes();

    let Some(axis) = scan_axis(&names) else {
        let mean = magnitudes.mean()?;
        return Some((0.0, mean));
    };

    let len = array.shape().get(axis).copied()?;
    let mut sums = vec![0.0; len];
    let mut counts = vec![0usize; len];
    for (index, magnitude) in magnitudes.indexed_iter() {
        sums[index[axis]] += magnitude;
        counts[index[axis]] += 1;
    }

    let (best, mean) = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, m)| match best {
            Some((_, top)) if top >= m => best,
            _ => Some((i, m)),
        })?;

    let position = array.coords[axis].values.get(best).copied()?;
    Some((position, mean))
}

#[async_trait]
impl Analyzer for PeakAnalyzer {
    async fn analyze(&self, dataset: &Dataset, ctx: &AnalysisContext) -> CollaboratorResult<Qoi> {
        let unit = &ctx.unit;
        if self.failing.contains(&unit.component) || unit.members.iter().any(|m| self.failing.contains(m)) {
            return Err(CollaboratorError::Failed(format!(
                "fit did not converge for {}",
                unit.component
            )));
        }

        let array = self.unit_array(dataset, ctx).ok_or_else(|| {
            CollaboratorError::Failed(format!("no data for {} in {}", unit.component, ctx.node))
        })?;
        let (position, magnitude) = locate_peak(array).ok_or_else(|| {
            CollaboratorError::Failed(format!("empty data for {}", unit.component))
        })?;
        debug!(
            "{} on {}: peak at {} (|y| = {:.3})",
            ctx.node, unit.component, position, magnitude
        );

        let mut qoi = Qoi::new();
        for (i, field) in ctx.redis_fields.iter().enumerate() {
            if self.omitted.contains(field) {
                continue;
            }
            qoi.insert(field.clone(), if i == 0 { position } else { magnitude });
        }
        Ok(qoi)
    }
}
