use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::approximator::{FunctionApproximator, Parameters};
use crate::error::{DdpgError, Result};
use crate::layers::{DenseLayer, LayerCache, WeightInit};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// A feed-forward stack of dense layers.
///
/// Parameters are ordered `[w0, b0, w1, b1, ...]` from input to output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
}

/// Per-layer caches recorded by [`NeuralNetwork::forward_traced`]
#[derive(Clone, Debug)]
pub struct NetworkTrace {
    caches: Vec<LayerCache>,
}

/// Result of backpropagating through a whole network
#[derive(Clone, Debug)]
pub struct Backprop {
    /// Gradients aligned with [`NeuralNetwork::parameters`]
    pub parameters: Parameters,
    /// Gradient with respect to the network input, one row per sample
    pub inputs: Array2<f32>,
}

impl NeuralNetwork {
    /// Create a new neural network with the given layer sizes and activations,
    /// drawing Xavier uniform weights from the thread RNG.
    pub fn new(layer_sizes: &[usize], activations: &[Activation]) -> Result<Self> {
        Self::new_using(layer_sizes, activations, WeightInit::default(), &mut rand::thread_rng())
    }

    /// Create a new neural network drawing its weights from `rng`.
    pub fn new_using<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: &[Activation],
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(DdpgError::invalid_parameter(
                "layer_sizes".to_string(),
                "must have at least 2 layer sizes".to_string(),
            ));
        }
        if layer_sizes.len() - 1 != activations.len() {
            return Err(DdpgError::dimension_mismatch(
                format!("{} activations", layer_sizes.len() - 1),
                format!("{} activations", activations.len()),
            ));
        }

        let layers = layer_sizes
            .windows(2)
            .zip(activations.iter())
            .map(|(window, &activation)| DenseLayer::new_using(window[0], window[1], activation, init, &mut *rng))
            .collect::<Result<Vec<_>>>()?;

        Ok(NeuralNetwork { layers })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.input_size())
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.output_size())
    }

    /// Forward pass for a single input vector.
    pub fn forward(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        let output = self.forward_batch(input.insert_axis(Axis(0)))?;
        Ok(output.index_axis_move(Axis(0), 0))
    }

    /// Forward pass for a batch of input vectors, one per row.
    pub fn forward_batch(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            current = layer.forward_batch(current.view())?;
        }
        Ok(current)
    }

    /// Forward pass recording what [`NeuralNetwork::backward_batch`] needs.
    pub fn forward_traced(&self, inputs: ArrayView2<f32>) -> Result<(Array2<f32>, NetworkTrace)> {
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            let (output, cache) = layer.forward_traced(current.view())?;
            caches.push(cache);
            current = output;
        }
        Ok((current, NetworkTrace { caches }))
    }

    /// Backpropagate `output_errors` (dLoss/dOutput) from the last layer to the input.
    pub fn backward_batch(&self, trace: &NetworkTrace, output_errors: ArrayView2<f32>) -> Result<Backprop> {
        if trace.caches.len() != self.layers.len() {
            return Err(DdpgError::dimension_mismatch(
                format!("trace of {} layers", self.layers.len()),
                format!("trace of {} layers", trace.caches.len()),
            ));
        }

        let mut gradients = Vec::with_capacity(self.layers.len() * 2);
        let mut current_error = output_errors.to_owned();

        for (layer, cache) in self.layers.iter().zip(trace.caches.iter()).rev() {
            let grads = layer.backward_batch(cache, current_error.view())?;
            current_error = grads.inputs.clone();
            let [w, b] = grads.into_parameters();
            gradients.push(b);
            gradients.push(w);
        }

        gradients.reverse();
        Ok(Backprop {
            parameters: gradients,
            inputs: current_error,
        })
    }
}

impl FunctionApproximator for NeuralNetwork {
    type Input<'a> = ArrayView2<'a, f32>;

    fn forward(&self, input: Self::Input<'_>) -> Result<Array2<f32>> {
        self.forward_batch(input)
    }

    fn parameters(&self) -> Parameters {
        self.layers.iter().flat_map(|layer| layer.parameters()).collect()
    }

    fn set_parameters(&mut self, parameters: &[ArrayD<f32>]) -> Result<()> {
        if parameters.len() != self.layers.len() * 2 {
            return Err(DdpgError::dimension_mismatch(
                format!("{} parameter tensors", self.layers.len() * 2),
                format!("{} parameter tensors", parameters.len()),
            ));
        }
        for (layer, pair) in self.layers.iter().zip(parameters.chunks(2)) {
            if pair[0].shape() != layer.weights.shape() || pair[1].shape() != layer.biases.shape() {
                return Err(DdpgError::dimension_mismatch(
                    format!("weights {:?}", layer.weights.shape()),
                    format!("weights {:?}", pair[0].shape()),
                ));
            }
        }
        for (layer, pair) in self.layers.iter_mut().zip(parameters.chunks(2)) {
            layer.set_parameters(&pair[0], &pair[1])?;
        }
        Ok(())
    }

    fn apply_gradients(&mut self, gradients: &[ArrayD<f32>], optimizer: &mut OptimizerWrapper) -> Result<()> {
        let mut views = self
            .layers
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect::<Vec<_>>();
        optimizer.step(&mut views, gradients)
    }
}
