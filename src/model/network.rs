// Dense feed-forward network
// Xavier-initialized layers over ndarray matrices, batched forward pass,
// and backprop for a sigmoid head trained with binary cross-entropy

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::model::config::{LayerSpec, NetworkConfig};

/// Probabilities are clamped this far from 0 and 1 before taking logs
const LOSS_EPSILON: f32 = 1e-7;

/// A fully-connected layer computing `activation(x · W + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub spec: LayerSpec,

    /// Shape `(inputs, outputs)`
    pub weights: Array2<f32>,

    pub biases: Array1<f32>,
}

impl DenseLayer {
    /// Xavier-uniform weights drawn in row-major order, zero biases
    pub fn xavier(spec: LayerSpec, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (spec.inputs + spec.outputs) as f32).sqrt();
        let weights = Array2::from_shape_simple_fn((spec.inputs, spec.outputs), || {
            rng.random_range(-limit..limit)
        });

        DenseLayer {
            spec,
            weights,
            biases: Array1::zeros(spec.outputs),
        }
    }

    pub fn zeroed(spec: LayerSpec) -> Self {
        DenseLayer {
            spec,
            weights: Array2::zeros((spec.inputs, spec.outputs)),
            biases: Array1::zeros(spec.outputs),
        }
    }

    /// One row per sample in, one row per sample out
    pub fn forward(&self, input: ArrayView2<'_, f32>) -> Array2<f32> {
        let activation = self.spec.activation;
        let mut output = input.dot(&self.weights) + &self.biases;
        output.mapv_inplace(|z| activation.apply(z));
        output
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Matrix shapes match `spec` and every parameter is finite
    fn is_well_formed(&self) -> bool {
        self.weights.dim() == (self.spec.inputs, self.spec.outputs)
            && self.biases.len() == self.spec.outputs
            && self.weights.iter().chain(self.biases.iter()).all(|p| p.is_finite())
    }
}

/// Gradient matrices shaped like one layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradient {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

/// Per-layer gradients for the whole network
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub layers: Vec<LayerGradient>,
}

impl Gradients {
    pub fn zeros_like(network: &Network) -> Self {
        Gradients {
            layers: network
                .layers
                .iter()
                .map(|layer| LayerGradient {
                    weights: Array2::zeros(layer.weights.raw_dim()),
                    biases: Array1::zeros(layer.biases.raw_dim()),
                })
                .collect(),
        }
    }
}

/// Stack of dense layers, input layer first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<DenseLayer>,
}

impl Network {
    /// Build a freshly initialized network. The RNG is seeded from the
    /// config, so identical configs give identical parameters.
    pub fn from_config(config: &NetworkConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let layers = config
            .layers
            .iter()
            .map(|spec| DenseLayer::xavier(*spec, &mut rng))
            .collect();

        Network { layers }
    }

    pub fn from_layers(layers: Vec<DenseLayer>) -> Self {
        Network { layers }
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    pub fn architecture(&self) -> Vec<LayerSpec> {
        self.layers.iter().map(|l| l.spec).collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(DenseLayer::parameter_count).sum()
    }

    /// True if the layer shapes equal `architecture` and all matrices are intact
    pub fn conforms_to(&self, architecture: &[LayerSpec]) -> bool {
        self.layers.len() == architecture.len()
            && self
                .layers
                .iter()
                .zip(architecture)
                .all(|(layer, spec)| layer.spec == *spec && layer.is_well_formed())
    }

    /// Output activations, one row per input row
    pub fn forward(&self, input: ArrayView2<'_, f32>) -> Array2<f32> {
        self.layers
            .iter()
            .fold(input.to_owned(), |activation, layer| {
                layer.forward(activation.view())
            })
    }

    /// Input batch followed by every layer's output
    fn forward_trace(&self, input: ArrayView2<'_, f32>) -> Vec<Array2<f32>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_owned());
        for layer in &self.layers {
            let next = layer.forward(activations[activations.len() - 1].view());
            activations.push(next);
        }
        activations
    }

    /// Mean binary cross-entropy over the batch and its parameter gradients.
    /// With a sigmoid head the output delta reduces to `(p - y) / n`.
    pub fn backprop(
        &self,
        inputs: ArrayView2<'_, f32>,
        targets: ArrayView2<'_, f32>,
    ) -> (f32, Gradients) {
        let batch = inputs.nrows().max(1) as f32;
        let activations = self.forward_trace(inputs);
        let output = &activations[activations.len() - 1];

        let loss = Zip::from(output)
            .and(&targets)
            .fold(0.0, |acc, &p, &y| acc + binary_cross_entropy(p, y))
            / batch;

        let mut delta = (output - &targets) / batch;
        let mut layers = Vec::with_capacity(self.layers.len());

        for index in (0..self.layers.len()).rev() {
            let layer_input = &activations[index];
            layers.push(LayerGradient {
                weights: layer_input.t().dot(&delta),
                biases: delta.sum_axis(Axis(0)),
            });

            if index == 0 {
                break;
            }

            let previous = self.layers[index - 1].spec.activation;
            let mut upstream = delta.dot(&self.layers[index].weights.t());
            Zip::from(&mut upstream)
                .and(layer_input)
                .for_each(|d, &a| *d *= previous.derivative(a));
            delta = upstream;
        }

        layers.reverse();
        (loss, Gradients { layers })
    }
}

pub fn binary_cross_entropy(probability: f32, target: f32) -> f32 {
    let p = probability.clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
    -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
}
