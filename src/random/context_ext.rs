use std::any::TypeId;
use std::cell::RefMut;

use log::trace;

use crate::context::Context;
use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::{Rng, SeedableRng};
use crate::random::roulette::roulette;
use crate::random::{RngHolder, RngId, RngPlugin};

/// Gets a mutable reference to the random number generator associated with the given
/// [`RngId`]. If the Rng has not been used before, one will be created with the base seed
/// you defined in `init_random`. Note that this will panic if `init_random` was not called yet.
fn get_rng<R: RngId + 'static>(context: &Context) -> RefMut<'_, R::RngType> {
    let data_container = context
        .get_data(RngPlugin)
        .expect("You must initialize the random number generator with a base seed");

    let rng_holders = data_container.rng_holders.borrow_mut();
    RefMut::map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                trace!(
                    "creating new RNG {} (seed={})",
                    R::get_name(),
                    data_container.base_seed
                );
                let seed_offset = hash_str(R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        data_container.base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .expect("RNG holder has the wrong type")
    })
}

#[cfg(feature = "scripted_draws")]
fn pop_scripted_draw<R: RngId + 'static>(context: &Context) -> Option<f64> {
    let data_container = context.get_data(RngPlugin)?;
    let mut scripted = data_container.scripted_draws.borrow_mut();
    scripted.get_mut(&TypeId::of::<R>())?.pop_front()
}

/// Random number generation on `Context`.
pub trait ContextRandomExt {
    /// Sets the base seed for every stream. Streams are created lazily on
    /// first use; calling this again resets them and discards scripted draws.
    fn init_random(&mut self, base_seed: u64);

    /// Gets a random sample from the stream `R` by applying `sampler` to its generator.
    ///
    /// # Panics
    ///
    /// Panics if `init_random` has not been called.
    fn sample<R: RngId + 'static, T>(
        &self,
        rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T;

    /// A uniform draw in `[0, 1)` from stream `R`. With the `scripted_draws`
    /// feature, values queued with `script_uniform_draws` are returned first.
    fn sample_uniform<R: RngId + 'static>(&self, rng_id: R) -> f64
    where
        R::RngType: Rng;

    /// A sample within `range` from stream `R`.
    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// `true` with probability `p`, from stream `R`.
    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng;

    /// Roulette selection over `probabilities` using one `sample_uniform` draw.
    /// Returns the selected index, or `None` for the trailing "no outcome"
    /// interval.
    fn sample_roulette<R: RngId + 'static>(&self, rng_id: R, probabilities: &[f64]) -> Option<usize>
    where
        R::RngType: Rng;

    /// Queues values that `sample_uniform` returns for stream `R` before it
    /// draws from the generator again. A testing aid for forcing specific
    /// outcomes; only available with the `scripted_draws` feature, which
    /// `--no-default-features` builds leave out.
    ///
    /// # Panics
    ///
    /// Panics if a value is outside `[0, 1)`.
    #[cfg(feature = "scripted_draws")]
    fn script_uniform_draws<R: RngId + 'static>(
        &mut self,
        rng_id: R,
        draws: impl IntoIterator<Item = f64>,
    );
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with base seed {base_seed}");
        let data_container = self.get_data_mut(RngPlugin);
        data_container.base_seed = base_seed;

        // Clear any existing Rngs to ensure they get re-seeded when they are next used
        data_container.rng_holders.get_mut().clear();
        #[cfg(feature = "scripted_draws")]
        data_container.scripted_draws.get_mut().clear();
    }

    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = get_rng::<R>(self);
        sampler(&mut rng)
    }

    fn sample_uniform<R: RngId + 'static>(&self, rng_id: R) -> f64
    where
        R::RngType: Rng,
    {
        #[cfg(feature = "scripted_draws")]
        if let Some(draw) = pop_scripted_draw::<R>(self) {
            return draw;
        }
        self.sample(rng_id, |rng| rng.random::<f64>())
    }

    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }

    fn sample_roulette<R: RngId + 'static>(&self, rng_id: R, probabilities: &[f64]) -> Option<usize>
    where
        R::RngType: Rng,
    {
        roulette(probabilities, self.sample_uniform(rng_id))
    }

    #[cfg(feature = "scripted_draws")]
    fn script_uniform_draws<R: RngId + 'static>(
        &mut self,
        _rng_id: R,
        draws: impl IntoIterator<Item = f64>,
    ) {
        let data_container = self.get_data_mut(RngPlugin);
        let queue = data_container
            .scripted_draws
            .get_mut()
            .entry(TypeId::of::<R>())
            .or_default();
        for draw in draws {
            assert!((0.0..1.0).contains(&draw), "Scripted draw {draw} is outside [0, 1)");
            queue.push_back(draw);
        }
    }
}
