// ============================================================
// Layer 5 — Optimiser Construction
// ============================================================
// AdamW (Loshchilov & Hutter, 2019): Adam moments plus weight
// decay applied directly to the parameters, not via the gradient.
//
// Burn fixes weight decay when the optimiser is built. To follow
// a per-epoch decay schedule the trainer rebuilds the optimiser
// with the new decay and loads the previous optimiser's record
// into it, so the moment estimates survive the change:
//
//   optim = adamw(wd).load_record(optim.to_record());

use burn::{
    module::AutodiffModule,
    optim::{AdamWConfig, Optimizer},
    tensor::backend::AutodiffBackend,
};

pub fn adamw<B, M>(weight_decay: f64) -> impl Optimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    AdamWConfig::new()
        .with_weight_decay(weight_decay as f32)
        .init()
}
