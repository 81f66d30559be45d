use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::{
    activation::activation::ActivationFunction,
    backend::differentiable::Differentiable,
    context::ExecutionContext,
    error::{MdnError, Result},
    layers::dense::{Dense, LayerGradients},
    math::matrix::Matrix,
    mixture::{self, params::shape_str, LikelihoodMode, MixtureParams},
    network::spec::MdnSpec,
};

/// Feed-forward network whose outputs parameterize a K-component Gaussian
/// mixture over a scalar target:
///
/// p(y | x) = Σ_k pi_k(x) · N(y; mu_k(x), sigma_k(x))
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixtureDensityNetwork {
    spec: MdnSpec,
    trunk: Vec<Dense>,
    mu_head: Dense,
    sigma_head: Dense,
    pi_head: Dense,
    #[serde(default)]
    likelihood: LikelihoodMode,
    /// Mixture parameters from the most recent `compute_mixture_parameters`.
    #[serde(skip)]
    state: Option<MixtureParams>,
}

impl MixtureDensityNetwork {
    /// Scalar input, two ReLU layers of 25 units, `components` mixture
    /// components.
    pub fn new(components: usize, ctx: &mut ExecutionContext) -> Result<MixtureDensityNetwork> {
        MixtureDensityNetwork::from_spec(MdnSpec::new(components), ctx)
    }

    pub fn from_spec(spec: MdnSpec, ctx: &mut ExecutionContext) -> Result<MixtureDensityNetwork> {
        spec.validate()?;
        let rng = ctx.rng();
        let trunk = spec.trunk_layers().iter().map(|layer| Dense::new(layer, &mut *rng)).collect();
        let mu_head = Dense::new(&spec.head_layer(ActivationFunction::Identity), rng);
        let sigma_head = Dense::new(&spec.head_layer(ActivationFunction::Exponential), rng);
        let pi_head = Dense::new(&spec.head_layer(ActivationFunction::Softmax), rng);

        let network = MixtureDensityNetwork {
            spec,
            trunk,
            mu_head,
            sigma_head,
            pi_head,
            likelihood: LikelihoodMode::default(),
            state: None,
        };
        debug!(
            components = network.spec.components,
            parameters = network.parameter_count(),
            "built mixture density network"
        );
        Ok(network)
    }

    pub fn with_likelihood_mode(mut self, mode: LikelihoodMode) -> MixtureDensityNetwork {
        self.likelihood = mode;
        self
    }

    pub fn spec(&self) -> &MdnSpec {
        &self.spec
    }

    pub fn components(&self) -> usize {
        self.spec.components
    }

    pub fn likelihood_mode(&self) -> LikelihoodMode {
        self.likelihood
    }

    /// Mixture parameters produced by the last `compute_mixture_parameters`
    /// (or any loss evaluation), if one has run.
    pub fn mixture_state(&self) -> Option<&MixtureParams> {
        self.state.as_ref()
    }

    fn check_inputs(&self, inputs: &Matrix) -> Result<()> {
        if inputs.rows == 0 {
            return Err(MdnError::EmptyBatch);
        }
        if inputs.cols != self.spec.input_dim {
            return Err(MdnError::shape(
                "network inputs",
                format!("Nx{}", self.spec.input_dim),
                shape_str(inputs),
            ));
        }
        Ok(())
    }

    fn check_targets(&self, inputs: &Matrix, targets: &Matrix) -> Result<()> {
        if targets.rows != inputs.rows || targets.cols != 1 {
            return Err(MdnError::shape(
                "network targets",
                format!("{}x1", inputs.rows),
                shape_str(targets),
            ));
        }
        Ok(())
    }

    /// Runs the trunk and the three heads over an N×input_dim batch,
    /// caching every layer's forward state for a following backward pass.
    ///
    /// The result is also kept as the network's held state.
    pub fn compute_mixture_parameters(&mut self, inputs: &Matrix) -> Result<MixtureParams> {
        self.check_inputs(inputs)?;
        let mut hidden = inputs.clone();
        for layer in &mut self.trunk {
            hidden = layer.forward(&hidden);
        }
        let params = MixtureParams::new(
            self.pi_head.forward(&hidden),
            self.mu_head.forward(&hidden),
            self.sigma_head.forward(&hidden),
        )?;
        self.state = Some(params.clone());
        Ok(params)
    }

    /// Mixture parameters for `inputs` without touching caches or held state.
    pub fn predict(&self, inputs: &Matrix) -> Result<MixtureParams> {
        self.check_inputs(inputs)?;
        let hidden = self.trunk.iter().fold(inputs.clone(), |h, layer| layer.evaluate(&h));
        MixtureParams::new(
            self.pi_head.evaluate(&hidden),
            self.mu_head.evaluate(&hidden),
            self.sigma_head.evaluate(&hidden),
        )
    }

    /// Total log-likelihood Σ_i ln p(y_i | x_i) of a batch.
    pub fn log_likelihood(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<f64> {
        self.check_inputs(inputs)?;
        self.check_targets(inputs, targets)?;
        let params = self.compute_mixture_parameters(inputs)?;
        mixture::log_likelihood(&params, targets, self.likelihood)
    }

    /// Serializes the architecture and trained parameters to pretty JSON.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Loads a network written by `save_json`, checking that the stored
    /// layers agree with the stored spec.
    pub fn load_json(path: &str) -> Result<MixtureDensityNetwork> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let network: MixtureDensityNetwork = serde_json::from_reader(reader)?;
        network.check_layers()?;
        Ok(network)
    }

    fn check_layers(&self) -> Result<()> {
        self.spec.validate()?;
        let expected = self.spec.trunk_layers().into_iter().chain([
            self.spec.head_layer(ActivationFunction::Identity),
            self.spec.head_layer(ActivationFunction::Exponential),
            self.spec.head_layer(ActivationFunction::Softmax),
        ]);
        let actual = self.layers();
        if actual.len() != self.spec.hidden_widths.len() + 3 {
            return Err(MdnError::InvalidSpec(format!(
                "expected {} layers, found {}",
                self.spec.hidden_widths.len() + 3,
                actual.len()
            )));
        }
        for (index, (want, layer)) in expected.zip(actual).enumerate() {
            let weights_ok = layer.weights.shape() == (want.input_width, want.output_width);
            let biases_ok = layer.biases.shape() == (1, want.output_width);
            let stored_ok = layer.weights.is_consistent() && layer.biases.is_consistent();
            if layer.spec() != want || !weights_ok || !biases_ok || !stored_ok {
                return Err(MdnError::InvalidSpec(format!("layer {index} does not match the spec")));
            }
        }
        Ok(())
    }
}

impl Differentiable for MixtureDensityNetwork {
    /// Mean negative log-likelihood per row.
    fn forward(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<f64> {
        let total = self.log_likelihood(inputs, targets)?;
        Ok(-total / inputs.rows as f64)
    }

    fn gradient(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<(f64, Vec<LayerGradients>)> {
        self.check_inputs(inputs)?;
        self.check_targets(inputs, targets)?;
        let params = self.compute_mixture_parameters(inputs)?;
        let loss = -mixture::log_likelihood(&params, targets, self.likelihood)? / inputs.rows as f64;
        let heads = mixture::nll_gradients(&params, targets)?;

        let (mu_grads, mu_input) = self.mu_head.backward_pre_activation(&heads.mu);
        let (sigma_grads, sigma_input) = self.sigma_head.backward_pre_activation(&heads.sigma);
        let (pi_grads, pi_input) = self.pi_head.backward_pre_activation(&heads.pi);

        // All three heads read the same trunk output.
        let mut delta = &(&mu_input + &sigma_input) + &pi_input;
        let mut trunk_grads = Vec::with_capacity(self.trunk.len());
        for layer in self.trunk.iter().rev() {
            let (grads, grad_input) = layer.backward(&delta);
            trunk_grads.push(grads);
            delta = grad_input;
        }
        trunk_grads.reverse();

        trunk_grads.extend([mu_grads, sigma_grads, pi_grads]);
        Ok((loss, trunk_grads))
    }

    fn layers(&self) -> Vec<&Dense> {
        self.trunk.iter()
            .chain([&self.mu_head, &self.sigma_head, &self.pi_head])
            .collect()
    }

    fn layers_mut(&mut self) -> Vec<&mut Dense> {
        self.trunk.iter_mut()
            .chain([&mut self.mu_head, &mut self.sigma_head, &mut self.pi_head])
            .collect()
    }
}
