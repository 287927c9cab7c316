// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// system works with: labelled samples, the datasets we know
// how to read, and the sources that produce samples.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One labelled image or voxel grid
pub mod sample;

// The datasets the CLI can train and probe on
pub mod dataset_kind;

// CPU or GPU execution
pub mod device;

// Core abstractions (traits) that other layers implement
pub mod traits;
