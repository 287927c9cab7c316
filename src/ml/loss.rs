// ============================================================
// Layer 5 — VAE Loss
// ============================================================
// loss = BCE(recon_logits, x) summed over every element
//      + beta * KL(q(z|x) || N(0, I))
//
// KL for a diagonal Gaussian against the unit prior:
//   -0.5 * Σ (1 + log σ² − μ² − σ²)
//
// Alongside the loss we report the reconstruction MSE in pixel
// space, scaled by the batch size so that summing it over the
// epoch and dividing by the dataset size gives a per-sample mean.
//
// Reference: Kingma & Welling (2014) Auto-Encoding Variational Bayes

use burn::{
    prelude::*,
    tensor::activation::{log_sigmoid, sigmoid},
};

pub struct VaeLoss<B: Backend> {
    /// Differentiable objective, shape [1]
    pub loss: Tensor<B, 1>,
    /// Tracked metric only, detached from the graph
    pub mse:  Tensor<B, 1>,
}

/// Numerically stable binary cross-entropy on logits, summed.
///
/// −Σ [ y·log σ(x) + (1 − y)·log σ(−x) ]
pub fn bce_with_logits_sum<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let log_p     = log_sigmoid(logits.clone());
    let log_not_p = log_sigmoid(logits.neg());
    let not_y     = targets.clone().neg().add_scalar(1.0);

    (targets * log_p + not_y * log_not_p).sum().neg()
}

/// KL divergence of N(mu, exp(log_var)) from N(0, 1), summed over batch and latent dims.
pub fn kl_divergence<B: Backend>(mu: Tensor<B, 2>, log_var: Tensor<B, 2>) -> Tensor<B, 1> {
    (log_var.clone().add_scalar(1.0) - mu.powf_scalar(2.0) - log_var.exp())
        .sum()
        .mul_scalar(-0.5)
}

pub fn vae_loss<B: Backend>(
    recon_logits: Tensor<B, 2>,
    x:            Tensor<B, 2>,
    mu:           Tensor<B, 2>,
    log_var:      Tensor<B, 2>,
    beta:         f64,
) -> VaeLoss<B> {
    let batch_size = x.dims()[0];

    let mse = (sigmoid(recon_logits.clone()) - x.clone())
        .powf_scalar(2.0)
        .mean()
        .mul_scalar(batch_size as f64)
        .detach();

    let reconstruction = bce_with_logits_sum(recon_logits, x);
    let kl             = kl_divergence(mu, log_var);

    VaeLoss { loss: reconstruction + kl.mul_scalar(beta), mse }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn scalar(t: Tensor<TB, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    fn tensor(values: &[f32], shape: [usize; 2]) -> Tensor<TB, 2> {
        Tensor::from_data(TensorData::new(values.to_vec(), shape), &Default::default())
    }

    #[test]
    fn test_bce_of_zero_logits_is_ln2_per_element() {
        let logits  = tensor(&[0.0; 6], [2, 3]);
        let targets = tensor(&[0.0, 1.0, 0.5, 0.2, 1.0, 0.0], [2, 3]);
        let bce     = scalar(bce_with_logits_sum(logits, targets));
        assert!((bce - 6.0 * std::f64::consts::LN_2).abs() < 1e-4);
    }

    #[test]
    fn test_bce_is_stable_for_large_logits() {
        let logits  = tensor(&[80.0, -80.0], [1, 2]);
        let targets = tensor(&[1.0, 0.0], [1, 2]);
        let bce     = scalar(bce_with_logits_sum(logits, targets));
        assert!(bce.is_finite());
        assert!(bce < 1e-6);
    }

    #[test]
    fn test_kl_is_zero_at_prior() {
        let mu      = tensor(&[0.0; 4], [2, 2]);
        let log_var = tensor(&[0.0; 4], [2, 2]);
        assert!(scalar(kl_divergence(mu, log_var)).abs() < 1e-6);
    }

    #[test]
    fn test_kl_closed_form() {
        // mu = 1, log_var = 0 → each element contributes 0.5
        let mu      = tensor(&[1.0, 1.0, 1.0], [1, 3]);
        let log_var = tensor(&[0.0, 0.0, 0.0], [1, 3]);
        assert!((scalar(kl_divergence(mu, log_var)) - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_beta_zero_reduces_to_reconstruction() {
        let logits  = tensor(&[0.3, -1.2, 2.0, 0.1], [2, 2]);
        let x       = tensor(&[0.0, 1.0, 1.0, 0.5], [2, 2]);
        let mu      = tensor(&[2.0, -1.0], [2, 1]);
        let log_var = tensor(&[0.5, -0.5], [2, 1]);

        let out = vae_loss(logits.clone(), x.clone(), mu, log_var, 0.0);
        let rec = scalar(bce_with_logits_sum(logits, x));
        assert!((scalar(out.loss) - rec).abs() < 1e-5);
    }

    #[test]
    fn test_beta_weights_kl() {
        let logits  = tensor(&[0.0, 0.0], [1, 2]);
        let x       = tensor(&[1.0, 0.0], [1, 2]);
        let mu      = tensor(&[1.0], [1, 1]);
        let log_var = tensor(&[0.0], [1, 1]);

        let l1 = scalar(vae_loss(logits.clone(), x.clone(), mu.clone(), log_var.clone(), 1.0).loss);
        let l3 = scalar(vae_loss(logits, x, mu, log_var, 3.0).loss);
        // KL = 0.5, so tripling beta adds 1.0
        assert!((l3 - l1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mse_is_scaled_by_batch_size() {
        // σ(0) = 0.5 against targets of 1 → squared error 0.25 everywhere
        let logits  = tensor(&[0.0; 8], [4, 2]);
        let x       = tensor(&[1.0; 8], [4, 2]);
        let mu      = tensor(&[0.0; 4], [4, 1]);
        let log_var = tensor(&[0.0; 4], [4, 1]);

        let out = vae_loss(logits, x, mu, log_var, 1.0);
        assert!((scalar(out.mse) - 0.25 * 4.0).abs() < 1e-6);
    }
}
