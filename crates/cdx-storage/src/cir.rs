//! Channel impulse response records

use num_complex::Complex64;

/// One propagation component of a CIR
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    /// Type id, must be registered in the link's component-type map
    pub component_type: u16,
    /// Component identifier assigned by the simulator
    pub id: u64,
    /// Delay relative to the reference delay in seconds
    pub delay: f64,
    /// Complex amplitude
    pub amplitude: Complex64,
}

impl Component {
    /// Create a new component
    pub fn new(component_type: u16, id: u64, delay: f64, amplitude: Complex64) -> Self {
        Self {
            component_type,
            id,
            delay,
            amplitude,
        }
    }
}

/// Components of one link at one time instant plus its reference delay
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cir {
    /// Components in the order they were written
    pub components: Vec<Component>,
    /// Reference delay of this time instant in seconds
    pub reference_delay: f64,
}

impl Cir {
    /// Type ids of all components
    pub fn types(&self) -> Vec<u16> {
        self.components.iter().map(|c| c.component_type).collect()
    }

    /// Identifiers of all components
    pub fn ids(&self) -> Vec<u64> {
        self.components.iter().map(|c| c.id).collect()
    }

    /// Delays of all components
    pub fn delays(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.delay).collect()
    }

    /// Amplitudes of all components
    pub fn amplitudes(&self) -> Vec<Complex64> {
        self.components.iter().map(|c| c.amplitude).collect()
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the CIR has no components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
