// ============================================================
// Layer 5 — Encoder Abstraction
// ============================================================
// Probes and representation metrics only need two things from
// a backbone: how wide its features are, and a way to map a
// batch of flattened inputs to features. Any burn module that
// implements this trait can be evaluated.

use burn::prelude::*;

pub trait Encoder<B: Backend> {
    /// Width of the representation produced by `embed`
    fn num_features(&self) -> usize;

    /// inputs: [batch, dim] → features: [batch, num_features]
    fn embed(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2>;
}
