use ndarray::{concatenate, s, Array2, ArrayD, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::approximator::{FunctionApproximator, Parameters};
use crate::error::{DdpgError, Result};
use crate::layers::dense::shape_error;
use crate::layers::{DenseLayer, LayerCache, WeightInit};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// Action-value function: (state, action) -> scalar.
///
/// State and action are encoded by separate ReLU branches, concatenated,
/// mixed by one more ReLU layer and reduced to a single linear output:
///
/// ```text
/// state  -> Dense(H, relu) --\
///                             concat(2H) -> Dense(H, relu) -> Dense(1)
/// action -> Dense(H, relu) --/
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Critic {
    state_branch: DenseLayer,
    action_branch: DenseLayer,
    hidden: DenseLayer,
    value_head: DenseLayer,
}

/// Activations recorded by [`Critic::forward_traced`]
#[derive(Clone, Debug)]
pub struct CriticTrace {
    state_branch: LayerCache,
    action_branch: LayerCache,
    hidden: LayerCache,
    value_head: LayerCache,
}

/// Gradients of a scalar loss with respect to the critic
#[derive(Clone, Debug)]
pub struct CriticGradients {
    /// Aligned with [`Critic::parameters`](FunctionApproximator::parameters)
    pub parameters: Parameters,
    /// dLoss/dAction, one row per sample
    pub actions: Array2<f32>,
}

impl Critic {
    pub fn new(state_dim: usize, action_dim: usize, hidden_size: usize) -> Result<Self> {
        Self::new_using(state_dim, action_dim, hidden_size, WeightInit::default(), &mut rand::thread_rng())
    }

    pub fn new_using<R: Rng + ?Sized>(
        state_dim: usize,
        action_dim: usize,
        hidden_size: usize,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Critic {
            state_branch: DenseLayer::new_using(state_dim, hidden_size, Activation::Relu, init, &mut *rng)?,
            action_branch: DenseLayer::new_using(action_dim, hidden_size, Activation::Relu, init, &mut *rng)?,
            hidden: DenseLayer::new_using(2 * hidden_size, hidden_size, Activation::Relu, init, &mut *rng)?,
            value_head: DenseLayer::new_using(hidden_size, 1, Activation::Linear, init, &mut *rng)?,
        })
    }

    pub fn state_dim(&self) -> usize {
        self.state_branch.input_size()
    }

    pub fn action_dim(&self) -> usize {
        self.action_branch.input_size()
    }

    fn layers(&self) -> [&DenseLayer; 4] {
        [&self.state_branch, &self.action_branch, &self.hidden, &self.value_head]
    }

    fn layers_mut(&mut self) -> [&mut DenseLayer; 4] {
        [&mut self.state_branch, &mut self.action_branch, &mut self.hidden, &mut self.value_head]
    }

    fn check_batch(states: &ArrayView2<f32>, actions: &ArrayView2<f32>) -> Result<()> {
        if states.nrows() != actions.nrows() {
            return Err(DdpgError::dimension_mismatch(
                format!("{} action rows", states.nrows()),
                format!("{} action rows", actions.nrows()),
            ));
        }
        Ok(())
    }

    /// Forward pass keeping the activations needed by [`Critic::backward`].
    pub fn forward_traced(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<(Array2<f32>, CriticTrace)> {
        Self::check_batch(&states, &actions)?;
        let (s, state_branch) = self.state_branch.forward_traced(states)?;
        let (a, action_branch) = self.action_branch.forward_traced(actions)?;
        let joined = concatenate(Axis(1), &[s.view(), a.view()]).map_err(shape_error)?;
        let (h, hidden) = self.hidden.forward_traced(joined.view())?;
        let (q, value_head) = self.value_head.forward_traced(h.view())?;
        Ok((q, CriticTrace { state_branch, action_branch, hidden, value_head }))
    }

    /// Backpropagate dLoss/dValue (shape `(batch, 1)`) through both branches.
    pub fn backward(&self, trace: &CriticTrace, value_errors: ArrayView2<f32>) -> Result<CriticGradients> {
        let value_grads = self.value_head.backward_batch(&trace.value_head, value_errors)?;
        let hidden_grads = self.hidden.backward_batch(&trace.hidden, value_grads.inputs.view())?;

        let width = self.state_branch.output_size();
        let state_errors = hidden_grads.inputs.slice(s![.., ..width]);
        let action_errors = hidden_grads.inputs.slice(s![.., width..]);
        let state_grads = self.state_branch.backward_batch(&trace.state_branch, state_errors)?;
        let action_grads = self.action_branch.backward_batch(&trace.action_branch, action_errors)?;

        let actions = action_grads.inputs.clone();
        let parameters = [state_grads, action_grads, hidden_grads, value_grads]
            .into_iter()
            .flat_map(|g| g.into_parameters())
            .collect();

        Ok(CriticGradients { parameters, actions })
    }

    /// dLoss/dAction alone; skips every parameter gradient and the state branch.
    pub fn action_gradients(&self, trace: &CriticTrace, value_errors: ArrayView2<f32>) -> Result<Array2<f32>> {
        let value_inputs = self.value_head.backward_inputs(&trace.value_head, value_errors)?;
        let hidden_inputs = self.hidden.backward_inputs(&trace.hidden, value_inputs.view())?;
        let width = self.state_branch.output_size();
        self.action_branch
            .backward_inputs(&trace.action_branch, hidden_inputs.slice(s![.., width..]))
    }
}

impl FunctionApproximator for Critic {
    type Input<'a> = (ArrayView2<'a, f32>, ArrayView2<'a, f32>);

    fn forward(&self, input: Self::Input<'_>) -> Result<Array2<f32>> {
        let (states, actions) = input;
        Self::check_batch(&states, &actions)?;
        let s = self.state_branch.forward_batch(states)?;
        let a = self.action_branch.forward_batch(actions)?;
        let joined = concatenate(Axis(1), &[s.view(), a.view()]).map_err(shape_error)?;
        let h = self.hidden.forward_batch(joined.view())?;
        self.value_head.forward_batch(h.view())
    }

    fn parameters(&self) -> Parameters {
        self.layers().into_iter().flat_map(|layer| layer.parameters()).collect()
    }

    fn set_parameters(&mut self, parameters: &[ArrayD<f32>]) -> Result<()> {
        if parameters.len() != 8 {
            return Err(DdpgError::dimension_mismatch(
                "8 parameter tensors".to_string(),
                format!("{} parameter tensors", parameters.len()),
            ));
        }
        // Validate every shape before touching any layer
        for (layer, pair) in self.layers().into_iter().zip(parameters.chunks(2)) {
            if pair[0].shape() != layer.weights.shape() || pair[1].shape() != layer.biases.shape() {
                return Err(DdpgError::dimension_mismatch(
                    format!("weights {:?}, biases {:?}", layer.weights.shape(), layer.biases.shape()),
                    format!("weights {:?}, biases {:?}", pair[0].shape(), pair[1].shape()),
                ));
            }
        }
        for (layer, pair) in self.layers_mut().into_iter().zip(parameters.chunks(2)) {
            layer.set_parameters(&pair[0], &pair[1])?;
        }
        Ok(())
    }

    fn apply_gradients(&mut self, gradients: &[ArrayD<f32>], optimizer: &mut OptimizerWrapper) -> Result<()> {
        let mut views = self
            .layers_mut()
            .into_iter()
            .flat_map(|layer| layer.parameters_mut())
            .collect::<Vec<_>>();
        optimizer.step(&mut views, gradients)
    }
}
