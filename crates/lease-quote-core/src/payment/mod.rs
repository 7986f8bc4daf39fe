pub mod allocation;
pub mod deal;
pub mod formula;
pub mod solver;
