//! C3 — Variable & Frame Graph.

pub mod frame;
pub mod resolver;
pub mod variable;

pub use frame::{FrameBody, FrameId, FrameSlot, VariableBindings, VariableChain};
pub use resolver::{FrameGraph, Resolution, resolve};
pub use variable::{VarId, Variable, VariableRead};
