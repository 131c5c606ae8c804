use jiff::SignedDuration;

/// Stop conditions for the generational search; the first one that trips ends
/// the run.
#[derive(Clone, Debug)]
pub enum Termination {
    Generations(usize),
    GenerationsWithoutImprovement(usize),
    Duration(SignedDuration),
}

#[derive(Clone, Debug)]
pub struct GaParams {
    pub population_size: usize,

    /// Individuals copied unchanged into the next generation; with at least
    /// one, the best fitness is non-increasing across generations.
    pub elite_count: usize,

    pub tournament_size: usize,

    /// Probability that an individual is mutated at all.
    pub mutation_probability: f64,

    /// Mutation operator applications per mutated individual (1..=max drawn
    /// uniformly).
    pub max_mutation_ops: usize,

    pub terminations: Vec<Termination>,

    /// Generations between best-allocation checkpoint exports, on top of
    /// every improvement.
    pub checkpoint_interval: usize,

    /// Fixed seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GaParams {
    fn default() -> Self {
        GaParams {
            population_size: 50,
            elite_count: 2,
            tournament_size: 3,
            mutation_probability: 0.3,
            max_mutation_ops: 5,
            terminations: vec![
                Termination::Generations(100),
                Termination::GenerationsWithoutImprovement(15),
            ],
            checkpoint_interval: 10,
            seed: None,
        }
    }
}
