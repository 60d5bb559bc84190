//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one area of the node
//! against the recording mocks in `mock_hw`.  Everything runs on the host
//! with no hardware attached.

mod lifecycle_tests;
mod mock_hw;
mod node_cycle_tests;
mod power_tests;
