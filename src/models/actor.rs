use ndarray::{Array2, ArrayD, ArrayView2};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::approximator::{FunctionApproximator, Parameters};
use crate::error::Result;
use crate::layers::WeightInit;
use crate::network::{NetworkTrace, NeuralNetwork};
use crate::optimizer::OptimizerWrapper;

/// Deterministic policy: state -> action, every component in (0, 1).
///
/// Two ReLU hidden layers followed by a sigmoid output layer. Callers that need
/// a different action range must rescale the output themselves.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Actor {
    network: NeuralNetwork,
}

impl Actor {
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
        let network = NeuralNetwork::new_using(
            &[state_dim, hidden_size, hidden_size, action_dim],
            &[Activation::Relu, Activation::Relu, Activation::Sigmoid],
            init,
            rng,
        )?;
        Ok(Actor { network })
    }

    pub fn state_dim(&self) -> usize {
        self.network.input_size()
    }

    pub fn action_dim(&self) -> usize {
        self.network.output_size()
    }

    pub fn network(&self) -> &NeuralNetwork {
        &self.network
    }

    /// Forward pass keeping the activations needed by [`Actor::backward`].
    pub fn forward_traced(&self, states: ArrayView2<f32>) -> Result<(Array2<f32>, NetworkTrace)> {
        self.network.forward_traced(states)
    }

    /// Parameter gradients given dLoss/dAction for each row of the traced batch.
    pub fn backward(&self, trace: &NetworkTrace, action_errors: ArrayView2<f32>) -> Result<Parameters> {
        Ok(self.network.backward_batch(trace, action_errors)?.parameters)
    }
}

impl FunctionApproximator for Actor {
    type Input<'a> = ArrayView2<'a, f32>;

    fn forward(&self, states: Self::Input<'_>) -> Result<Array2<f32>> {
        self.network.forward_batch(states)
    }

    fn parameters(&self) -> Parameters {
        self.network.parameters()
    }

    fn set_parameters(&mut self, parameters: &[ArrayD<f32>]) -> Result<()> {
        self.network.set_parameters(parameters)
    }

    fn apply_gradients(&mut self, gradients: &[ArrayD<f32>], optimizer: &mut OptimizerWrapper) -> Result<()> {
        self.network.apply_gradients(gradients, optimizer)
    }
}
