use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayViewMutD, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DdpgError, Result};
use super::initialization::WeightInit;

/// A fully connected (dense) layer: `activation(inputs · weights + biases)`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

/// What a traced forward pass remembers for the backward pass.
#[derive(Clone, Debug)]
pub struct LayerCache {
    inputs: Array2<f32>,
    pre_activation: Array2<f32>,
}

/// Gradients of a scalar loss with respect to one layer.
#[derive(Clone, Debug)]
pub struct LayerGradients {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    /// Gradient with respect to the layer's inputs, one row per sample
    pub inputs: Array2<f32>,
}

impl DenseLayer {
    /// Create a new dense layer with Xavier uniform weights and zero biases.
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Result<Self> {
        Self::new_using(input_size, output_size, activation, WeightInit::default(), &mut rand::thread_rng())
    }

    /// Create a new dense layer drawing its weights from `rng`.
    pub fn new_using<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        if input_size == 0 || output_size == 0 {
            return Err(DdpgError::invalid_parameter(
                "layer_size".to_string(),
                format!("dense layer {}x{} has a zero dimension", input_size, output_size),
            ));
        }

        Ok(DenseLayer {
            weights: init.initialize_weights((input_size, output_size), rng)?,
            biases: init.initialize_biases(output_size),
            activation,
        })
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Result<Self> {
        if weights.dim() != self.weights.dim() {
            return Err(DdpgError::dimension_mismatch(
                format!("{:?}", self.weights.dim()),
                format!("{:?}", weights.dim()),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Result<Self> {
        if biases.dim() != self.biases.dim() {
            return Err(DdpgError::dimension_mismatch(
                format!("{:?}", self.biases.dim()),
                format!("{:?}", biases.dim()),
            ));
        }
        self.biases = biases;
        Ok(self)
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    fn pre_activation(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.ncols() != self.input_size() {
            return Err(DdpgError::dimension_mismatch(
                format!("{} input columns", self.input_size()),
                format!("{} input columns", inputs.ncols()),
            ));
        }
        Ok(inputs.dot(&self.weights) + &self.biases)
    }

    /// Forward pass for a batch of inputs, one sample per row.
    pub fn forward_batch(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut outputs = self.pre_activation(inputs)?;
        self.activation.apply_batch(&mut outputs);
        Ok(outputs)
    }

    /// Forward pass that also returns the cache needed by [`DenseLayer::backward_batch`].
    pub fn forward_traced(&self, inputs: ArrayView2<f32>) -> Result<(Array2<f32>, LayerCache)> {
        let pre_activation = self.pre_activation(inputs)?;
        let mut outputs = pre_activation.clone();
        self.activation.apply_batch(&mut outputs);
        let cache = LayerCache {
            inputs: inputs.to_owned(),
            pre_activation,
        };
        Ok((outputs, cache))
    }

    /// Backpropagate `output_errors` (dLoss/dOutput) through the layer.
    pub fn backward_batch(&self, cache: &LayerCache, output_errors: ArrayView2<f32>) -> Result<LayerGradients> {
        let adjusted_error = self.adjusted_errors(cache, output_errors)?;

        Ok(LayerGradients {
            weights: cache.inputs.t().dot(&adjusted_error),
            biases: adjusted_error.sum_axis(Axis(0)),
            inputs: adjusted_error.dot(&self.weights.t()),
        })
    }

    /// Only the input gradient of [`DenseLayer::backward_batch`]
    pub fn backward_inputs(&self, cache: &LayerCache, output_errors: ArrayView2<f32>) -> Result<Array2<f32>> {
        Ok(self.adjusted_errors(cache, output_errors)?.dot(&self.weights.t()))
    }

    fn adjusted_errors(&self, cache: &LayerCache, output_errors: ArrayView2<f32>) -> Result<Array2<f32>> {
        if output_errors.dim() != cache.pre_activation.dim() {
            return Err(DdpgError::dimension_mismatch(
                format!("{:?}", cache.pre_activation.dim()),
                format!("{:?}", output_errors.dim()),
            ));
        }
        let activation_deriv = self.activation.derivative_batch(cache.pre_activation.view());
        Ok(&output_errors * &activation_deriv)
    }

    /// Weights then biases, as dynamic-dimension tensors
    pub fn parameters(&self) -> [ArrayD<f32>; 2] {
        [self.weights.clone().into_dyn(), self.biases.clone().into_dyn()]
    }

    /// Mutable views over weights then biases
    pub fn parameters_mut(&mut self) -> [ArrayViewMutD<'_, f32>; 2] {
        [self.weights.view_mut().into_dyn(), self.biases.view_mut().into_dyn()]
    }

    /// Overwrite weights and biases from dynamic-dimension tensors
    pub fn set_parameters(&mut self, weights: &ArrayD<f32>, biases: &ArrayD<f32>) -> Result<()> {
        if weights.shape() != self.weights.shape() || biases.shape() != self.biases.shape() {
            return Err(DdpgError::dimension_mismatch(
                format!("weights {:?}, biases {:?}", self.weights.shape(), self.biases.shape()),
                format!("weights {:?}, biases {:?}", weights.shape(), biases.shape()),
            ));
        }
        self.weights.assign(&weights.view().into_dimensionality::<ndarray::Ix2>().map_err(shape_error)?);
        self.biases.assign(&biases.view().into_dimensionality::<ndarray::Ix1>().map_err(shape_error)?);
        Ok(())
    }
}

impl LayerGradients {
    /// Weight then bias gradients, matching [`DenseLayer::parameters`]
    pub fn into_parameters(self) -> [ArrayD<f32>; 2] {
        [self.weights.into_dyn(), self.biases.into_dyn()]
    }
}

pub(crate) fn shape_error(err: ndarray::ShapeError) -> DdpgError {
    DdpgError::dimension_mismatch("a compatible shape".to_string(), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fixed_layer(activation: Activation) -> DenseLayer {
        DenseLayer::new(2, 2, activation)
            .unwrap()
            .with_weights(array![[1.0, -1.0], [0.5, 2.0]])
            .unwrap()
            .with_biases(array![0.1, -0.1])
            .unwrap()
    }

    #[test]
    fn test_forward_batch() {
        let layer = fixed_layer(Activation::Linear);
        let out = layer.forward_batch(array![[1.0, 2.0], [0.0, 0.0]].view()).unwrap();
        let expected = array![[2.1, 2.9], [0.1, -0.1]];
        assert!((&out - &expected).iter().all(|d| d.abs() < 1e-6));
    }

    #[test]
    fn test_relu_masks_negative_outputs() {
        let layer = fixed_layer(Activation::Relu);
        let out = layer.forward_batch(array![[0.0, 0.0]].view()).unwrap();
        assert_eq!(out, array![[0.1, 0.0]]);
    }

    #[test]
    fn test_wrong_input_width() {
        let layer = fixed_layer(Activation::Linear);
        let result = layer.forward_batch(array![[1.0, 2.0, 3.0]].view());
        assert!(matches!(result, Err(DdpgError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_backward_linear() {
        let layer = fixed_layer(Activation::Linear);
        let inputs = array![[1.0, 2.0]];
        let (_, cache) = layer.forward_traced(inputs.view()).unwrap();
        let grads = layer.backward_batch(&cache, array![[1.0, 0.0]].view()).unwrap();

        assert_eq!(grads.weights, array![[1.0, 0.0], [2.0, 0.0]]);
        assert_eq!(grads.biases, array![1.0, 0.0]);
        assert_eq!(grads.inputs, array![[1.0, 0.5]]);
    }

    #[test]
    fn test_set_parameters_round_trip() {
        let source = DenseLayer::new(3, 4, Activation::Relu).unwrap();
        let mut target = DenseLayer::new(3, 4, Activation::Relu).unwrap();
        let [w, b] = source.parameters();
        target.set_parameters(&w, &b).unwrap();
        assert_eq!(source, target);

        let wrong = ArrayD::zeros(vec![4, 3]);
        assert!(target.set_parameters(&wrong, &b).is_err());
    }
}
