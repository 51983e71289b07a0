// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal: training
// a translator or translating with a trained one.
//
// Rules for this layer:
//   - No model math here (Layer 5)
//   - No argument parsing or printing here (Layer 1)
//   - File formats belong to Layer 4 and Layer 6
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// The translation workflow
pub mod translate_use_case;
