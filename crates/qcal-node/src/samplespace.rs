//! Sweep samplespaces.
//!
//! A samplespace maps `parameter -> component -> values`. Parameters keep
//! their declaration order, which fixes the order of the dataset axes and
//! of the flat acquisition buffer (first declared parameter varies fastest).

use qcal_types::Component;
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};

/// One swept parameter on one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepDimension {
    /// Parameter name, e.g. `ro_frequencies`.
    pub name: String,
    /// Component the values belong to. May be a coupler shared by two qubits.
    pub component: Component,
    /// Ordered sweep values.
    pub values: Vec<f64>,
}

impl SweepDimension {
    /// Number of sweep points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the dimension has no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Name and length of one axis of a validated samplespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub len: usize,
}

/// Validated axes of a samplespace, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepShape {
    axes: Vec<Axis>,
}

impl SweepShape {
    /// Build a shape from `(name, len)` pairs.
    pub fn new<I, S>(axes: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        Self {
            axes: axes
                .into_iter()
                .map(|(name, len)| Axis {
                    name: name.into(),
                    len,
                })
                .collect(),
        }
    }

    /// Axes in declaration order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Axis lengths in declaration order.
    pub fn lengths(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.len).collect()
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.axes.len()
    }

    /// Check if there are no axes.
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Total number of combinations. An empty shape has exactly one.
    pub fn size(&self) -> usize {
        self.axes.iter().map(|a| a.len).product()
    }

    /// Per-axis indices of the combination at flat position `index`.
    ///
    /// The first axis varies fastest. Returns `None` past the end.
    pub fn combination_at(&self, index: usize) -> Option<Vec<usize>> {
        if index >= self.size() {
            return None;
        }
        let mut rest = index;
        Some(
            self.axes
                .iter()
                .map(|axis| {
                    let i = rest % axis.len;
                    rest /= axis.len;
                    i
                })
                .collect(),
        )
    }
}

/// A value assigned to one parameter of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedValue {
    pub parameter: String,
    pub component: Component,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SweepParameter {
    name: String,
    entries: Vec<(Component, Vec<f64>)>,
}

/// Ordered mapping `parameter -> component -> values`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSpace {
    parameters: Vec<SweepParameter>,
}

impl SampleSpace {
    /// Create an empty samplespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the values of `parameter` on `component`, replacing earlier ones.
    pub fn insert(&mut self, parameter: impl Into<String>, component: Component, values: Vec<f64>) {
        let parameter = parameter.into();
        let slot = match self.parameters.iter().position(|p| p.name == parameter) {
            Some(pos) => &mut self.parameters[pos],
            None => {
                self.parameters.push(SweepParameter {
                    name: parameter,
                    entries: Vec::new(),
                });
                let last = self.parameters.len() - 1;
                &mut self.parameters[last]
            }
        };

        match slot.entries.iter_mut().find(|(c, _)| *c == component) {
            Some((_, existing)) => *existing = values,
            None => slot.entries.push((component, values)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, parameter: impl Into<String>, component: Component, values: Vec<f64>) -> Self {
        self.insert(parameter, component, values);
        self
    }

    /// Check if nothing is swept.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Values of a parameter on a component.
    pub fn values(&self, parameter: &str, component: &Component) -> Option<&[f64]> {
        self.parameters
            .iter()
            .find(|p| p.name == parameter)?
            .entries
            .iter()
            .find(|(c, _)| c == component)
            .map(|(_, v)| v.as_slice())
    }

    /// Parameter names in declaration order.
    pub fn dimension_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Components mentioned anywhere, in first-seen order.
    pub fn components(&self) -> Vec<&Component> {
        let mut seen: Vec<&Component> = Vec::new();
        for (component, _) in self.parameters.iter().flat_map(|p| p.entries.iter()) {
            if !seen.contains(&component) {
                seen.push(component);
            }
        }
        seen
    }

    /// Dimensions that apply to `component`, in declaration order.
    ///
    /// A qubit sees its own entries and the entries of any coupler it is
    /// part of. Each parameter appears at most once.
    pub fn for_component(&self, component: &Component) -> Vec<SweepDimension> {
        self.parameters
            .iter()
            .filter_map(|p| {
                let exact = p.entries.iter().find(|(c, _)| c == component);
                let shared = || {
                    p.entries
                        .iter()
                        .find(|(c, _)| c.is_coupler() && c.involves(component))
                };
                exact.or_else(shared).map(|(c, values)| SweepDimension {
                    name: p.name.clone(),
                    component: c.clone(),
                    values: values.clone(),
                })
            })
            .collect()
    }

    /// Validate the samplespace against the measured components.
    ///
    /// Every entry of a parameter must have the same number of values, and
    /// every component in `targets` must sweep every parameter.
    pub fn dimensions(&self, targets: &[Component]) -> NodeResult<SweepShape> {
        let mut axes = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            let Some((first, values)) = parameter.entries.first() else {
                continue;
            };
            if values.is_empty() {
                return Err(NodeError::Configuration(format!(
                    "dimension '{}' on {} has no values",
                    parameter.name, first
                )));
            }
            for (component, other) in &parameter.entries[1..] {
                if other.len() != values.len() {
                    return Err(NodeError::DimensionMismatch {
                        dimension: parameter.name.clone(),
                        component: component.to_string(),
                        expected: values.len(),
                        found: other.len(),
                    });
                }
            }
            axes.push((parameter.name.clone(), values.len()));
        }

        let expected: Vec<String> = axes.iter().map(|(n, _)| n.clone()).collect();
        for target in targets {
            let found: Vec<String> = self
                .for_component(target)
                .into_iter()
                .map(|d| d.name)
                .collect();
            if found != expected {
                return Err(NodeError::CoSweepMismatch {
                    component: target.to_string(),
                    expected,
                    found,
                });
            }
        }

        Ok(SweepShape::new(axes))
    }

    /// Per-parameter indices of the combination at `index`.
    pub fn combination_at(&self, targets: &[Component], index: usize) -> NodeResult<Vec<usize>> {
        let shape = self.dimensions(targets)?;
        shape.combination_at(index).ok_or_else(|| {
            NodeError::Configuration(format!(
                "combination {index} out of range for {} combinations",
                shape.size()
            ))
        })
    }

    /// Every component's value at combination `index`.
    pub fn assignment_at(
        &self,
        targets: &[Component],
        index: usize,
    ) -> NodeResult<Vec<AssignedValue>> {
        let combination = self.combination_at(targets, index)?;
        let mut assignment = Vec::new();
        for (parameter, &i) in self
            .parameters
            .iter()
            .filter(|p| !p.entries.is_empty())
            .zip(&combination)
        {
            for (component, values) in &parameter.entries {
                assignment.push(AssignedValue {
                    parameter: parameter.name.clone(),
                    component: component.clone(),
                    value: values[i],
                });
            }
        }
        Ok(assignment)
    }

    /// Total number of combinations.
    pub fn size(&self, targets: &[Component]) -> NodeResult<usize> {
        Ok(self.dimensions(targets)?.size())
    }
}
