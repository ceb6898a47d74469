use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::network::DenseLayer;

/// Adam optimizer with per-layer first/second-moment state.
///
/// Moment buffers are allocated per layer at construction; `step` applies
/// one bias-corrected update to every layer at a fixed learning rate.
#[derive(Serialize, Deserialize, Clone)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    t: i32,
}

impl Adam {
    pub fn new(layers: &[DenseLayer], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        let m_weights = layers
            .iter()
            .map(|layer| Array2::<f32>::zeros(layer.weights.dim()))
            .collect();
        let v_weights = layers
            .iter()
            .map(|layer| Array2::<f32>::zeros(layer.weights.dim()))
            .collect();
        let m_biases = layers
            .iter()
            .map(|layer| Array1::<f32>::zeros(layer.biases.dim()))
            .collect();
        let v_biases = layers
            .iter()
            .map(|layer| Array1::<f32>::zeros(layer.biases.dim()))
            .collect();

        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights,
            v_weights,
            m_biases,
            v_biases,
            t: 0,
        }
    }

    pub fn default_for(layers: &[DenseLayer]) -> Self {
        Self::new(layers, 0.9, 0.999, 1e-8)
    }

    /// Apply one optimization step given per-layer (weight, bias) gradients.
    pub fn step(
        &mut self,
        layers: &mut [DenseLayer],
        gradients: &[(Array2<f32>, Array1<f32>)],
        learning_rate: f32,
    ) {
        debug_assert_eq!(layers.len(), gradients.len());
        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);

        for (i, (layer, (weight_grad, bias_grad))) in
            layers.iter_mut().zip(gradients.iter()).enumerate()
        {
            let m = &mut self.m_weights[i];
            let v = &mut self.v_weights[i];
            *m = &*m * self.beta1 + &(weight_grad * (1.0 - self.beta1));
            *v = &*v * self.beta2 + &(weight_grad * weight_grad * (1.0 - self.beta2));
            let m_hat = m.mapv(|x| x / bias_correction1);
            let v_hat = v.mapv(|x| x / bias_correction2);
            layer.weights -= &((&m_hat / (v_hat.mapv(f32::sqrt) + self.epsilon)) * learning_rate);

            let m = &mut self.m_biases[i];
            let v = &mut self.v_biases[i];
            *m = &*m * self.beta1 + &(bias_grad * (1.0 - self.beta1));
            *v = &*v * self.beta2 + &(bias_grad * bias_grad * (1.0 - self.beta2));
            let m_hat = m.mapv(|x| x / bias_correction1);
            let v_hat = v.mapv(|x| x / bias_correction2);
            layer.biases -= &((&m_hat / (v_hat.mapv(f32::sqrt) + self.epsilon)) * learning_rate);
        }
    }
}
