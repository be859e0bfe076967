//! Named, seeded random streams.
//!
//! Every stream is derived from one base seed set with
//! `ContextRandomExt::init_random`, offset by a hash of the stream's name, so
//! that adding draws to one stream never shifts another. The transition
//! handlers share a single stream and consume it in a fixed order; graph
//! construction and pathogen seeding each use their own.
mod context_ext;
mod macros;
mod roulette;

use std::any::{Any, TypeId};
use std::cell::RefCell;
#[cfg(feature = "scripted_draws")]
use std::collections::VecDeque;

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;
pub use roulette::{roulette, validate_roulette_probabilities};

use crate::define_data_plugin;
use crate::hashing::HashMap;
use crate::rand::SeedableRng;

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// This is a wrapper that allows for future support for different types of
// random number generators (anything that implements SeedableRng is valid).
struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: u64,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
    // Values handed out by `sample_uniform` ahead of the generator, per stream.
    #[cfg(feature = "scripted_draws")]
    scripted_draws: RefCell<HashMap<TypeId, VecDeque<f64>>>,
}

// Registers a data container which stores:
// * base_seed: A base seed for all rngs
// * rng_holders: A map of rngs, keyed by their RngId. Note that this is
//   stored in a RefCell to allow for mutable borrow without requiring a
//   mutable borrow of the Context itself.
// * scripted_draws: Uniform values queued by `script_uniform_draws`
define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(HashMap::default()),
        #[cfg(feature = "scripted_draws")]
        scripted_draws: RefCell::new(HashMap::default()),
    }
);
