pub mod allocation;
pub mod crossover;
pub mod fitness;
pub mod initialize;
pub mod mutation;
pub mod params;
pub mod search;
pub mod select;
