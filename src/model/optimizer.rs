// Adam optimizer
// First/second moment estimates with bias correction

use ndarray::{Array, Dimension, Zip};

use crate::model::network::{Gradients, Network};

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-8;

pub struct Adam {
    learning_rate: f32,
    step: i32,
    first_moment: Gradients,
    second_moment: Gradients,
}

/// Scalars shared by every parameter in one update
#[derive(Clone, Copy)]
struct StepSize {
    learning_rate: f32,
    correction1: f32,
    correction2: f32,
}

impl StepSize {
    fn apply<D: Dimension>(
        self,
        params: &mut Array<f32, D>,
        grads: &Array<f32, D>,
        m: &mut Array<f32, D>,
        v: &mut Array<f32, D>,
    ) {
        Zip::from(params)
            .and(grads)
            .and(m)
            .and(v)
            .for_each(|param, &grad, m, v| {
                *m = BETA1 * *m + (1.0 - BETA1) * grad;
                *v = BETA2 * *v + (1.0 - BETA2) * grad * grad;
                let m_hat = *m / self.correction1;
                let v_hat = *v / self.correction2;
                *param -= self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
            });
    }
}

impl Adam {
    /// Moments start at zero and are shaped like `network`
    pub fn new(learning_rate: f32, network: &Network) -> Self {
        Adam {
            learning_rate,
            step: 0,
            first_moment: Gradients::zeros_like(network),
            second_moment: Gradients::zeros_like(network),
        }
    }

    /// Apply one update using batch-mean gradients
    pub fn step(&mut self, network: &mut Network, grads: &Gradients) {
        self.step += 1;
        let size = StepSize {
            learning_rate: self.learning_rate,
            correction1: 1.0 - BETA1.powi(self.step),
            correction2: 1.0 - BETA2.powi(self.step),
        };

        let layers = network
            .layers_mut()
            .iter_mut()
            .zip(&grads.layers)
            .zip(self.first_moment.layers.iter_mut())
            .zip(self.second_moment.layers.iter_mut());

        for (((layer, g), m), v) in layers {
            size.apply(&mut layer.weights, &g.weights, &mut m.weights, &mut v.weights);
            size.apply(&mut layer.biases, &g.biases, &mut m.biases, &mut v.biases);
        }
    }

    pub fn steps_taken(&self) -> i32 {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::NetworkConfig;

    #[test]
    fn test_first_step_moves_against_gradient_by_learning_rate() {
        let mut network = Network::from_config(&NetworkConfig::default());
        let before = network.clone();

        let mut grads = Gradients::zeros_like(&network);
        grads.layers[2].biases[0] = 0.3;
        grads.layers[0].weights[[0, 0]] = -2.0;

        let mut adam = Adam::new(0.001, &network);
        adam.step(&mut network, &grads);

        let bias_delta = network.layers()[2].biases[0] - before.layers()[2].biases[0];
        let weight_delta =
            network.layers()[0].weights[[0, 0]] - before.layers()[0].weights[[0, 0]];

        assert!((bias_delta + 0.001).abs() < 1e-5);
        assert!((weight_delta - 0.001).abs() < 1e-5);
        assert_eq!(network.layers()[0].weights[[0, 1]], before.layers()[0].weights[[0, 1]]);
        assert_eq!(adam.steps_taken(), 1);
    }

    #[test]
    fn test_zero_gradient_leaves_parameters() {
        let mut network = Network::from_config(&NetworkConfig::default());
        let before = network.clone();

        let grads = Gradients::zeros_like(&network);
        let mut adam = Adam::new(0.001, &network);
        adam.step(&mut network, &grads);

        assert_eq!(network, before);
    }
}
