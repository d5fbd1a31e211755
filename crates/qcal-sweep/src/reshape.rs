//! Reshaping of flat acquisitions into labelled datasets.
//!
//! The compiled schedule writes one flat buffer per acquisition channel:
//! the swept values of the schedule samplespace with the first declared
//! dimension varying fastest, followed by the trailing calibration points.
//! Channel `c` belongs to component `c % n` (and readout state `c / n` for
//! multi-state layouts) where `n` is the number of measured components.
//!
//! For nodes with an external dimension one buffer arrives per external
//! combination; the blocks are concatenated so the external axis is the
//! slowest varying one and ends up last.

use ndarray::{Array2, ArrayD, IxDyn};
use num_complex::Complex64;
use qcal_node::{NodeDescriptor, ReadoutLayout};
use qcal_types::Component;
use tracing::debug;

use crate::collaborator::RawAcquisition;
use crate::dataset::{ArrayAttributes, Coordinate, DataArray, Dataset};
use crate::error::{ReshapeError, ReshapeResult};

/// Component that acquisition `channel` belongs to.
pub fn channel_to_component(channel: usize, num_components: usize, targets: &[Component]) -> Option<&Component> {
    if num_components == 0 {
        return None;
    }
    targets.get(channel % num_components)
}

/// Reorder a state-discrimination block.
///
/// Values arrive ordered `(loop, group, state)` with `state` fastest. The
/// result holds, for every group in turn, all `loops * states` shots with
/// `state` fastest then `loop`.
pub fn reshuffle_state_discrimination(
    values: &[Complex64],
    groups: usize,
    loops: usize,
    states: usize,
) -> ReshapeResult<Vec<Complex64>> {
    let expected = groups * loops * states;
    if values.len() != expected {
        return Err(ReshapeError::LengthMismatch {
            component: "state discrimination block".to_string(),
            expected,
            found: values.len(),
        });
    }

    let mut out = Vec::with_capacity(expected);
    for group in 0..groups {
        for lp in 0..loops {
            for state in 0..states {
                out.push(values[(lp * groups + group) * states + state]);
            }
        }
    }
    Ok(out)
}

/// Turns acquisitions of one node into a [`Dataset`].
pub struct DatasetReshaper<'a> {
    descriptor: &'a NodeDescriptor,
}

impl<'a> DatasetReshaper<'a> {
    pub fn new(descriptor: &'a NodeDescriptor) -> Self {
        Self { descriptor }
    }

    /// Reshape acquisition blocks into a dataset.
    ///
    /// `external_indices` lists the external combination each block belongs
    /// to. It must be `None` (with exactly one block) when the node has no
    /// external samplespace.
    pub fn reshape(
        &self,
        blocks: &[RawAcquisition],
        external_indices: Option<&[usize]>,
    ) -> ReshapeResult<Dataset> {
        let d = self.descriptor;
        let shape = d.schedule_samplespace.dimensions(&d.components)?;
        let size = shape.size();
        let calibration_count = d.calibration_points.count();

        let expected_blocks = external_indices.map_or(1, <[usize]>::len);
        if blocks.len() != expected_blocks {
            return Err(ReshapeError::BlockMismatch {
                blocks: blocks.len(),
                indices: expected_blocks,
            });
        }

        let mut lengths = shape.lengths();
        if external_indices.is_some() {
            lengths.push(blocks.len());
        }
        let reversed: Vec<usize> = lengths.iter().rev().copied().collect();

        let num_components = d.components.len();
        let mut dataset = Dataset::new(&d.name, d.qubit_state);

        for channel in 0..d.channel_count() {
            let component = channel_to_component(channel, num_components, &d.components)
                .ok_or(ReshapeError::MissingChannel(channel))?;

            let mut swept = Vec::with_capacity(size * blocks.len());
            let mut calibration = Vec::with_capacity(calibration_count * blocks.len());
            for block in blocks {
                let samples = block
                    .channel(channel)
                    .ok_or(ReshapeError::MissingChannel(channel))?;
                if samples.len() != size + calibration_count {
                    return Err(ReshapeError::LengthMismatch {
                        component: component.to_string(),
                        expected: size + calibration_count,
                        found: samples.len(),
                    });
                }
                let (body, points) = samples.split_at(size);
                swept.extend(self.order_block(body)?);
                calibration.extend_from_slice(points);
            }

            let values = ArrayD::from_shape_vec(IxDyn(&reversed), swept)?.reversed_axes();
            let calibration = if calibration_count > 0 {
                Some(Array2::from_shape_vec((blocks.len(), calibration_count), calibration)?.reversed_axes())
            } else {
                None
            };

            let readout_state = match d.readout_layout {
                ReadoutLayout::MultiState { .. } => Some(channel / num_components),
                _ => None,
            };
            let name = match readout_state {
                Some(state) => format!("y{component}_{state}"),
                None => format!("y{component}"),
            };

            debug!("Reshaped channel {} into {} {:?}", channel, name, values.shape());
            dataset.insert(
                name,
                DataArray {
                    component: component.clone(),
                    coords: self.coordinates(component, external_indices)?,
                    values,
                    calibration,
                    attrs: ArrayAttributes {
                        component: component.clone(),
                        node: d.name.clone(),
                        qubit_state: d.qubit_state,
                        readout_state,
                    },
                },
            );
        }

        Ok(dataset)
    }

    fn order_block(&self, body: &[Complex64]) -> ReshapeResult<Vec<Complex64>> {
        match self.descriptor.readout_layout {
            ReadoutLayout::StateDiscriminationLoop { loops, states } => {
                let shots = loops * usize::from(states);
                if shots == 0 || body.len() % shots != 0 {
                    return Err(ReshapeError::Shape(format!(
                        "{} values do not split into groups of {shots} shots",
                        body.len()
                    )));
                }
                reshuffle_state_discrimination(body, body.len() / shots, loops, usize::from(states))
            }
            _ => Ok(body.to_vec()),
        }
    }

    fn coordinates(
        &self,
        component: &Component,
        external_indices: Option<&[usize]>,
    ) -> ReshapeResult<Vec<Coordinate>> {
        let d = self.descriptor;
        let mut coords: Vec<Coordinate> = d
            .schedule_samplespace
            .for_component(component)
            .into_iter()
            .map(|dim| Coordinate::new(dim.name, dim.values))
            .collect();

        if let Some(indices) = external_indices {
            let coord = match d.external_samplespace.for_component(component).into_iter().next() {
                Some(dim) => {
                    let values = indices
                        .iter()
                        .map(|&i| {
                            dim.values.get(i).copied().ok_or_else(|| {
                                ReshapeError::Shape(format!(
                                    "external index {i} out of range for '{}' ({} values) on {component}",
                                    dim.name,
                                    dim.values.len()
                                ))
                            })
                        })
                        .collect::<ReshapeResult<Vec<f64>>>()?;
                    Coordinate::new(dim.name, values)
                }
                None => Coordinate::new("external", indices.iter().map(|&i| i as f64).collect()),
            };
            coords.push(coord);
        }
        Ok(coords)
    }
}
