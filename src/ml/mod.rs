// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model, loss and optimisation code lives here.
//
//   model.rs     — fully connected VAE (encoder, mu/log_var
//                  heads, decoder producing logits)
//   encoder.rs   — the Encoder trait probes are written against
//   loss.rs      — BCE-with-logits + beta-weighted KL
//   schedule.rs  — warmup/cosine LR, cosine weight decay, StepLR
//   optim.rs     — AdamW construction
//   trainer.rs   — VAE training loop with per-epoch probe
//   probe.rs     — single-step and full linear probing
//   features.rs  — std / correlation / entropy of embeddings
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Kingma & Welling (2014) Auto-Encoding Variational Bayes

pub mod encoder;

/// VAE architecture
pub mod model;

pub mod loss;

pub mod schedule;

pub mod optim;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Linear classifiers on frozen or fine-tuned features
pub mod probe;

pub mod features;
