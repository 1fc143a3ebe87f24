use ndarray::{Array2, ArrayView2};

use crate::error::{DdpgError, Result};

/// Trait defining the interface for loss functions
pub trait Loss {
    /// Compute the loss for a batch of predictions and targets
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32>;

    /// Compute the gradient of the loss with respect to predictions
    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<Array2<f32>>;
}

/// Mean Squared Error: `mean((prediction - target)^2)` over every element
pub struct MSE;

fn check_shapes(predictions: &ArrayView2<f32>, targets: &ArrayView2<f32>) -> Result<()> {
    if predictions.dim() != targets.dim() {
        return Err(DdpgError::dimension_mismatch(
            format!("targets shaped {:?}", predictions.dim()),
            format!("{:?}", targets.dim()),
        ));
    }
    if predictions.is_empty() {
        return Err(DdpgError::invalid_parameter("predictions".to_string(), "empty batch".to_string()));
    }
    Ok(())
}

impl Loss for MSE {
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        check_shapes(&predictions, &targets)?;
        let diff = &predictions - &targets;
        Ok(diff.mapv(|d| d * d).sum() / diff.len() as f32)
    }

    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_shapes(&predictions, &targets)?;
        let n = predictions.len() as f32;
        Ok((&predictions - &targets).mapv(|d| 2.0 * d / n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse_value_and_gradient() {
        let predictions = array![[1.0], [3.0]];
        let targets = array![[0.0], [1.0]];

        let loss = MSE.compute_batch(predictions.view(), targets.view()).unwrap();
        assert_eq!(loss, 2.5);

        let grad = MSE.gradient_batch(predictions.view(), targets.view()).unwrap();
        assert_eq!(grad, array![[1.0], [2.0]]);
    }

    #[test]
    fn test_mse_shape_mismatch() {
        let predictions = array![[1.0], [3.0]];
        let targets = array![[0.0, 1.0]];
        assert!(MSE.compute_batch(predictions.view(), targets.view()).is_err());
    }
}
