use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, Distribution},
};

use crate::ml::encoder::Encoder;

#[derive(Config, Debug)]
pub struct VaeConfig {
    pub input_dim:  usize,
    #[config(default = 512)]
    pub hidden_dim: usize,
    #[config(default = 32)]
    pub latent_dim: usize,
}

impl VaeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> VaeModel<B> {
        VaeModel {
            enc_in:       LinearConfig::new(self.input_dim, self.hidden_dim).init(device),
            enc_hidden:   LinearConfig::new(self.hidden_dim, self.hidden_dim).init(device),
            mu_head:      LinearConfig::new(self.hidden_dim, self.latent_dim).init(device),
            log_var_head: LinearConfig::new(self.hidden_dim, self.latent_dim).init(device),
            dec_in:       LinearConfig::new(self.latent_dim, self.hidden_dim).init(device),
            dec_hidden:   LinearConfig::new(self.hidden_dim, self.hidden_dim).init(device),
            dec_out:      LinearConfig::new(self.hidden_dim, self.input_dim).init(device),
            latent_dim:   self.latent_dim,
        }
    }
}

/// MLP variational autoencoder over flattened inputs.
#[derive(Module, Debug)]
pub struct VaeModel<B: Backend> {
    pub enc_in:       Linear<B>,
    pub enc_hidden:   Linear<B>,
    pub mu_head:      Linear<B>,
    pub log_var_head: Linear<B>,
    pub dec_in:       Linear<B>,
    pub dec_hidden:   Linear<B>,
    pub dec_out:      Linear<B>,
    pub latent_dim:   usize,
}

pub struct VaeOutput<B: Backend> {
    /// Reconstruction logits: [batch, input_dim]
    pub logits:  Tensor<B, 2>,
    pub mu:      Tensor<B, 2>,
    pub log_var: Tensor<B, 2>,
}

impl<B: Backend> VaeModel<B> {
    /// x: [batch, input_dim] → (mu, log_var): [batch, latent_dim]
    pub fn encode(&self, x: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let h = relu(self.enc_in.forward(x));
        let h = relu(self.enc_hidden.forward(h));
        (self.mu_head.forward(h.clone()), self.log_var_head.forward(h))
    }

    /// z: [batch, latent_dim] → logits: [batch, input_dim]
    pub fn decode(&self, z: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = relu(self.dec_in.forward(z));
        let h = relu(self.dec_hidden.forward(h));
        self.dec_out.forward(h)
    }

    /// Encode, sample z = mu + σ·ε with the reparameterisation trick, decode.
    pub fn reconstruct(&self, x: Tensor<B, 2>) -> VaeOutput<B> {
        let (mu, log_var) = self.encode(x);
        let std = log_var.clone().mul_scalar(0.5).exp();
        let eps = Tensor::<B, 2>::random(mu.shape(), Distribution::Normal(0.0, 1.0), &mu.device());
        let z   = mu.clone() + eps * std;

        VaeOutput { logits: self.decode(z), mu, log_var }
    }
}

impl<B: Backend> Encoder<B> for VaeModel<B> {
    fn num_features(&self) -> usize {
        self.latent_dim
    }

    // The posterior mean is the deterministic representation.
    fn embed(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.encode(inputs).0
    }
}
