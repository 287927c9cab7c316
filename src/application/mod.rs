// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal:
// training an encoder, or evaluating a trained one.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination and backend selection
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The VAE training workflow
pub mod train_use_case;

// Linear probing + representation metrics on a checkpoint
pub mod probe_use_case;
