//! Gradient-descent update rules.
//!
//! An optimizer owns its learning rate and any per-parameter state (Adam's
//! moment estimates). Parameters and gradients are passed as aligned slices of
//! dynamic-dimension tensors, so one optimizer instance serves any network whose
//! parameter list keeps the same shapes between steps.

use ndarray::{ArrayD, ArrayViewMutD, Zip};
use serde::{Serialize, Deserialize};

use crate::error::{DdpgError, Result};

pub trait Optimizer {
    /// Current step size
    fn learning_rate(&self) -> f32;

    /// Apply one descent step: `parameters[i]` moves against `gradients[i]`.
    fn step(&mut self, parameters: &mut [ArrayViewMutD<'_, f32>], gradients: &[ArrayD<f32>]) -> Result<()>;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn learning_rate(&self) -> f32 {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.learning_rate(),
            OptimizerWrapper::Adam(optimizer) => optimizer.learning_rate(),
        }
    }

    fn step(&mut self, parameters: &mut [ArrayViewMutD<'_, f32>], gradients: &[ArrayD<f32>]) -> Result<()> {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(parameters, gradients),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(parameters, gradients),
        }
    }
}

fn check_aligned(parameters: &[ArrayViewMutD<'_, f32>], gradients: &[ArrayD<f32>]) -> Result<()> {
    if parameters.len() != gradients.len() {
        return Err(DdpgError::dimension_mismatch(
            format!("{} gradient tensors", parameters.len()),
            format!("{} gradient tensors", gradients.len()),
        ));
    }
    for (index, (param, grad)) in parameters.iter().zip(gradients).enumerate() {
        if param.shape() != grad.shape() {
            return Err(DdpgError::dimension_mismatch(
                format!("gradient {} with shape {:?}", index, param.shape()),
                format!("shape {:?}", grad.shape()),
            ));
        }
    }
    Ok(())
}

/// Plain stochastic gradient descent
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SGD {
    pub learning_rate: f32,
}

impl SGD {
    pub fn new(learning_rate: f32) -> SGD {
        SGD { learning_rate }
    }
}

impl Optimizer for SGD {
    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn step(&mut self, parameters: &mut [ArrayViewMutD<'_, f32>], gradients: &[ArrayD<f32>]) -> Result<()> {
        check_aligned(parameters, gradients)?;
        let lr = self.learning_rate;
        for (param, grad) in parameters.iter_mut().zip(gradients) {
            param.zip_mut_with(grad, |w, &g| *w -= lr * g);
        }
        Ok(())
    }
}

/// Adam with bias-corrected first and second moment estimates.
///
/// Moment buffers are allocated on the first step from the gradient shapes and
/// indexed by parameter position afterwards.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
    /// Number of completed steps
    pub t: u32,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn with_learning_rate(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn step(&mut self, parameters: &mut [ArrayViewMutD<'_, f32>], gradients: &[ArrayD<f32>]) -> Result<()> {
        check_aligned(parameters, gradients)?;

        if self.m.is_empty() {
            self.m = gradients.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.v = gradients.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
        } else if self.m.len() != gradients.len()
            || self.m.iter().zip(gradients).any(|(m, g)| m.shape() != g.shape())
        {
            return Err(DdpgError::dimension_mismatch(
                "gradients shaped like the first Adam step".to_string(),
                format!("{} tensors with different shapes", gradients.len()),
            ));
        }

        self.t += 1;
        let (beta1, beta2, epsilon, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let bias_correction1 = 1.0 - beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - beta2.powi(self.t as i32);

        for ((param, grad), (m, v)) in parameters
            .iter_mut()
            .zip(gradients)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            Zip::from(param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|w, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias_correction1;
                    let v_hat = *v / bias_correction2;
                    *w -= lr * m_hat / (v_hat.sqrt() + epsilon);
                });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};

    #[test]
    fn test_sgd_step() {
        let mut weights = array![[1.0_f32, 2.0], [3.0, 4.0]];
        let mut biases = array![0.5_f32, -0.5];
        let gradients = vec![
            array![[1.0_f32, 1.0], [1.0, 1.0]].into_dyn(),
            array![1.0_f32, -1.0].into_dyn(),
        ];

        let mut sgd = SGD::new(0.1);
        {
            let mut params = [weights.view_mut().into_dyn(), biases.view_mut().into_dyn()];
            sgd.step(&mut params, &gradients).unwrap();
        }

        let expected_weights = array![[0.9_f32, 1.9], [2.9, 3.9]];
        let expected_biases = array![0.4_f32, -0.4];
        assert!((&weights - &expected_weights).iter().all(|d| d.abs() < 1e-6));
        assert!((&biases - &expected_biases).iter().all(|d| d.abs() < 1e-6));
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        // With bias correction the first Adam step is lr * sign(g) up to epsilon
        let mut weights = Array2::<f32>::zeros((2, 3));
        let gradients = vec![Array2::<f32>::from_elem((2, 3), 0.5).into_dyn()];

        let mut adam = Adam::with_learning_rate(0.01);
        {
            let mut params = [weights.view_mut().into_dyn()];
            adam.step(&mut params, &gradients).unwrap();
        }

        assert_eq!(adam.t, 1);
        for &w in weights.iter() {
            assert!((w + 0.01).abs() < 1e-6);
        }
    }

    #[test]
    fn test_adam_rejects_changed_shapes() {
        let mut a = Array1::<f32>::zeros(3);
        let mut adam = Adam::with_learning_rate(0.01);
        {
            let mut params = [a.view_mut().into_dyn()];
            adam.step(&mut params, &[Array1::<f32>::ones(3).into_dyn()]).unwrap();
        }

        let mut b = Array1::<f32>::zeros(4);
        let mut params = [b.view_mut().into_dyn()];
        let result = adam.step(&mut params, &[Array1::<f32>::ones(4).into_dyn()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_misaligned_gradients() {
        let mut a = Array1::<f32>::zeros(3);
        let mut params = [a.view_mut().into_dyn()];
        let mut sgd = OptimizerWrapper::SGD(SGD::new(0.1));
        assert!(sgd.step(&mut params, &[]).is_err());
        assert_eq!(sgd.learning_rate(), 0.1);
    }
}
