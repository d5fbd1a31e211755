//! Labelled multi-dimensional datasets.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayD};
use num_complex::Complex64;
use qcal_types::{Component, QubitState};
use serde::{Deserialize, Serialize};

/// One labelled axis of a data array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub name: String,
    pub values: Vec<f64>,
}

impl Coordinate {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Attributes attached to every data array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayAttributes {
    pub component: Component,
    pub node: String,
    pub qubit_state: QubitState,
    /// Prepared state of a multi-state readout channel.
    pub readout_state: Option<usize>,
}

/// Measured values of one component on its sweep coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub component: Component,
    /// One coordinate per axis of `values`, in the same order.
    pub coords: Vec<Coordinate>,
    pub values: ArrayD<Complex64>,
    /// Calibration-point acquisitions, shaped `(calibration state, block)`.
    pub calibration: Option<Array2<Complex64>>,
    pub attrs: ArrayAttributes,
}

impl DataArray {
    /// Axis lengths.
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Coordinate with the given name.
    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.iter().find(|c| c.name == name)
    }

    /// Values in acquisition order, first axis fastest.
    ///
    /// Exact inverse of the reshape applied when the array was built.
    pub fn to_flat(&self) -> Vec<Complex64> {
        self.values.view().reversed_axes().iter().copied().collect()
    }

    /// Magnitude of every value, in the array's own layout.
    pub fn magnitudes(&self) -> ArrayD<f64> {
        self.values.mapv(|v| v.norm())
    }
}

/// Named data arrays produced by one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub node: String,
    pub qubit_state: QubitState,
    arrays: BTreeMap<String, DataArray>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new(node: impl Into<String>, qubit_state: QubitState) -> Self {
        Self {
            node: node.into(),
            qubit_state,
            arrays: BTreeMap::new(),
        }
    }

    /// Add an array under a name.
    pub fn insert(&mut self, name: impl Into<String>, array: DataArray) {
        self.arrays.insert(name.into(), array);
    }

    /// Array with the given name.
    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.arrays.get(name)
    }

    /// Array names, sorted.
    pub fn array_names(&self) -> Vec<&str> {
        self.arrays.keys().map(String::as_str).collect()
    }

    /// All arrays with their names.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DataArray)> {
        self.arrays.iter()
    }

    /// Arrays measured on a component.
    pub fn for_component(&self, component: &Component) -> Vec<&DataArray> {
        self.arrays
            .values()
            .filter(|a| &a.component == component)
            .collect()
    }

    /// Dataset restricted to the given components.
    pub fn subset(&self, components: &[Component]) -> Dataset {
        Dataset {
            node: self.node.clone(),
            qubit_state: self.qubit_state,
            arrays: self
                .arrays
                .iter()
                .filter(|(_, a)| components.contains(&a.component))
                .map(|(k, a)| (k.clone(), a.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn array(component: &str, values: ArrayD<Complex64>) -> DataArray {
        let component = Component::qubit(component);
        DataArray {
            component: component.clone(),
            coords: vec![],
            values,
            calibration: None,
            attrs: ArrayAttributes {
                component,
                node: "x".to_string(),
                qubit_state: QubitState::Ground,
                readout_state: None,
            },
        }
    }

    #[test]
    fn test_to_flat_first_axis_fastest() {
        // values[[i, j]] = i + 10 j
        let values = ArrayD::from_shape_fn(IxDyn(&[2, 3]), |ix| {
            Complex64::new((ix[0] + 10 * ix[1]) as f64, 0.0)
        });
        let flat: Vec<f64> = array("q1", values).to_flat().iter().map(|c| c.re).collect();
        assert_eq!(flat, vec![0.0, 1.0, 10.0, 11.0, 20.0, 21.0]);
    }

    #[test]
    fn test_subset() {
        let mut dataset = Dataset::new("x", QubitState::Ground);
        let zeros = ArrayD::zeros(IxDyn(&[2]));
        dataset.insert("yq1", array("q1", zeros.clone()));
        dataset.insert("yq2", array("q2", zeros));

        let subset = dataset.subset(&[Component::qubit("q2")]);
        assert_eq!(subset.array_names(), vec!["yq2"]);
        assert_eq!(dataset.for_component(&Component::qubit("q1")).len(), 1);
    }
}
