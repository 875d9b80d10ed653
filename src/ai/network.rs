use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::NetworkError;

/// Output-layer activation. The hidden layer is always ReLU; the output
/// activation is what distinguishes the model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputActivation {
    /// Identity — per-action value heads.
    Linear,
    /// Logistic sigmoid — single-probability heads.
    Sigmoid,
    /// Normalized exponential — categorical policy heads.
    Softmax,
}

/// Weight initialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Init {
    /// N(0, 1) scaled down by 50. Used by the RL variants.
    Small,
    /// He initialization for the hidden layer, Xavier for the output layer.
    HeXavier,
}

/// Per-layer weight gradients. Shapes match the corresponding weight
/// matrices, bias gradient in the trailing column.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub hidden: Array2<f64>,
    pub output: Array2<f64>,
}

impl Gradients {
    /// Zeroed gradients for a network with the given sizes.
    pub fn zeros(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        Gradients {
            hidden: Array2::zeros((hidden_size, input_size + 1)),
            output: Array2::zeros((output_size, hidden_size + 1)),
        }
    }

    /// Element-wise accumulation for summing per-sample gradients.
    pub fn accumulate(&mut self, other: &Gradients) {
        self.hidden += &other.hidden;
        self.output += &other.output;
    }
}

/// Two-layer feedforward network: ReLU hidden layer plus a variant-specific
/// output activation. Weight matrices carry the bias as the trailing column,
/// multiplied by a fixed input of 1.
#[derive(Debug, Clone)]
pub struct Network {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    learning_rate: f64,
    activation: OutputActivation,
    hidden_weights: Array2<f64>,
    output_weights: Array2<f64>,
}

impl Network {
    /// Create a network with randomly initialized weights and zero biases.
    pub fn with_random_weights(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        learning_rate: f64,
        activation: OutputActivation,
        init: Init,
        rng: &mut StdRng,
    ) -> Self {
        let (hidden_scale, output_scale) = match init {
            Init::Small => (1.0 / 50.0, 1.0 / 50.0),
            Init::HeXavier => (
                (2.0 / input_size as f64).sqrt(),
                (1.0 / hidden_size as f64).sqrt(),
            ),
        };

        let mut hidden_weights = Array2::zeros((hidden_size, input_size + 1));
        for w in hidden_weights.slice_mut(s![.., ..input_size]).iter_mut() {
            let n: f64 = rng.sample(StandardNormal);
            *w = n * hidden_scale;
        }

        let mut output_weights = Array2::zeros((output_size, hidden_size + 1));
        for w in output_weights.slice_mut(s![.., ..hidden_size]).iter_mut() {
            let n: f64 = rng.sample(StandardNormal);
            *w = n * output_scale;
        }

        Network {
            input_size,
            hidden_size,
            output_size,
            learning_rate,
            activation,
            hidden_weights,
            output_weights,
        }
    }

    /// Build a network from existing weight matrices, validating that their
    /// shapes match the declared sizes.
    pub fn from_weights(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        learning_rate: f64,
        activation: OutputActivation,
        hidden_weights: Array2<f64>,
        output_weights: Array2<f64>,
    ) -> Result<Self, NetworkError> {
        if hidden_weights.dim() != (hidden_size, input_size + 1) {
            let (actual_rows, actual_cols) = hidden_weights.dim();
            return Err(NetworkError::WeightShape {
                layer: "hidden",
                rows: hidden_size,
                cols: input_size + 1,
                actual_rows,
                actual_cols,
            });
        }
        if output_weights.dim() != (output_size, hidden_size + 1) {
            let (actual_rows, actual_cols) = output_weights.dim();
            return Err(NetworkError::WeightShape {
                layer: "output",
                rows: output_size,
                cols: hidden_size + 1,
                actual_rows,
                actual_cols,
            });
        }
        Ok(Network {
            input_size,
            hidden_size,
            output_size,
            learning_rate,
            activation,
            hidden_weights,
            output_weights,
        })
    }

    /// Forward propagation: `(hidden, output)` activations for one input.
    pub fn forward(
        &self,
        input: ArrayView1<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>), NetworkError> {
        self.check_input_len(input.len())?;

        let mut hidden = self
            .hidden_weights
            .slice(s![.., ..self.input_size])
            .dot(&input);
        hidden += &self.hidden_weights.column(self.input_size);
        hidden.mapv_inplace(|v| v.max(0.0));

        let mut output = self
            .output_weights
            .slice(s![.., ..self.hidden_size])
            .dot(&hidden);
        output += &self.output_weights.column(self.hidden_size);
        self.activate(output.view_mut());

        Ok((hidden, output))
    }

    /// Batched forward propagation. Rows of `inputs` are samples; returns
    /// `(hidden, output)` matrices with matching row order.
    pub fn batch_forward(
        &self,
        inputs: ArrayView2<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>), NetworkError> {
        self.check_input_len(inputs.ncols())?;

        let mut hidden = inputs.dot(&self.hidden_weights.slice(s![.., ..self.input_size]).t());
        hidden += &self.hidden_weights.column(self.input_size);
        hidden.mapv_inplace(|v| v.max(0.0));

        let mut output = hidden.dot(&self.output_weights.slice(s![.., ..self.hidden_size]).t());
        output += &self.output_weights.column(self.hidden_size);
        for row in output.rows_mut() {
            self.activate(row);
        }

        Ok((hidden, output))
    }

    /// Back propagation from a variant-computed output-layer delta. Returns
    /// per-layer gradients as outer products of deltas with layer inputs;
    /// the bias gradient is the delta itself. The ReLU mask passes gradient
    /// only where the hidden activation is strictly positive.
    pub fn backward(
        &self,
        input: ArrayView1<f64>,
        hidden: ArrayView1<f64>,
        output_delta: ArrayView1<f64>,
    ) -> Gradients {
        let mut output_grads = Array2::zeros((self.output_size, self.hidden_size + 1));
        output_grads
            .slice_mut(s![.., ..self.hidden_size])
            .assign(&outer(output_delta, hidden));
        output_grads
            .column_mut(self.hidden_size)
            .assign(&output_delta);

        // Total error per hidden neuron, masked by the ReLU derivative.
        let predeltas = output_delta.dot(&self.output_weights.slice(s![.., ..self.hidden_size]));
        let hidden_deltas = predeltas * &hidden.mapv(|h| if h > 0.0 { 1.0 } else { 0.0 });

        let mut hidden_grads = Array2::zeros((self.hidden_size, self.input_size + 1));
        hidden_grads
            .slice_mut(s![.., ..self.input_size])
            .assign(&outer(hidden_deltas.view(), input));
        hidden_grads
            .column_mut(self.input_size)
            .assign(&hidden_deltas);

        Gradients {
            hidden: hidden_grads,
            output: output_grads,
        }
    }

    /// Batched back propagation. Rows of every argument are samples; the
    /// returned gradients are already summed over the batch.
    pub fn batch_backward(
        &self,
        inputs: ArrayView2<f64>,
        hiddens: ArrayView2<f64>,
        output_deltas: ArrayView2<f64>,
    ) -> Gradients {
        let mut output_grads = Array2::zeros((self.output_size, self.hidden_size + 1));
        output_grads
            .slice_mut(s![.., ..self.hidden_size])
            .assign(&output_deltas.t().dot(&hiddens));
        output_grads
            .column_mut(self.hidden_size)
            .assign(&output_deltas.sum_axis(Axis(0)));

        let predeltas = output_deltas.dot(&self.output_weights.slice(s![.., ..self.hidden_size]));
        let hidden_deltas = predeltas * &hiddens.mapv(|h| if h > 0.0 { 1.0 } else { 0.0 });

        let mut hidden_grads = Array2::zeros((self.hidden_size, self.input_size + 1));
        hidden_grads
            .slice_mut(s![.., ..self.input_size])
            .assign(&hidden_deltas.t().dot(&inputs));
        hidden_grads
            .column_mut(self.input_size)
            .assign(&hidden_deltas.sum_axis(Axis(0)));

        Gradients {
            hidden: hidden_grads,
            output: output_grads,
        }
    }

    /// Plain gradient descent: `W ← W − learning_rate · grad`. Callers decide
    /// whether the gradients are per-sample or pre-summed over a batch.
    pub fn apply_gradients(&mut self, grads: &Gradients) {
        self.hidden_weights.scaled_add(-self.learning_rate, &grads.hidden);
        self.output_weights.scaled_add(-self.learning_rate, &grads.output);
    }

    fn activate(&self, mut output: ndarray::ArrayViewMut1<f64>) {
        match self.activation {
            OutputActivation::Linear => {}
            OutputActivation::Sigmoid => {
                output.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp()));
            }
            OutputActivation::Softmax => {
                let max = output.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
                output.mapv_inplace(|v| (v - max).exp());
                let sum = output.sum();
                output.mapv_inplace(|v| v / sum);
            }
        }
    }

    fn check_input_len(&self, actual: usize) -> Result<(), NetworkError> {
        if actual != self.input_size {
            return Err(NetworkError::InputLength {
                expected: self.input_size,
                actual,
            });
        }
        Ok(())
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn activation(&self) -> OutputActivation {
        self.activation
    }

    pub fn hidden_weights(&self) -> &Array2<f64> {
        &self.hidden_weights
    }

    pub fn output_weights(&self) -> &Array2<f64> {
        &self.output_weights
    }
}

/// Mean squared error between an expected and a predicted output vector.
pub fn mean_squared_error(expected: ArrayView1<f64>, output: ArrayView1<f64>) -> f64 {
    let difference = &expected - &output;
    difference.dot(&difference) / difference.len() as f64
}

fn outer(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Array2<f64> {
    a.insert_axis(Axis(1)).dot(&b.insert_axis(Axis(0)))
}
