pub mod compiler;
pub mod escape;
pub mod graph;
pub mod services;
