use std::any::TypeId;
use std::cell::RefMut;

use log::trace;

use crate::context::Context;
use crate::hashing::hash_str;
use crate::rand::rngs::SmallRng;
use crate::rand::SeedableRng;
use crate::random::{RngId, RngPlugin};

/// Borrows the stream for `R`, creating and seeding it on first use.
///
/// # Panics
/// Panics if `init_random` was not called yet.
fn get_rng<R: RngId>(context: &Context) -> RefMut<'_, SmallRng> {
    let data_container = context
        .get_data_container(RngPlugin)
        .expect("You must initialize the random number generator with a base seed");

    RefMut::map(data_container.streams.borrow_mut(), |streams| {
        streams.entry(TypeId::of::<R>()).or_insert_with(|| {
            let seed = data_container
                .base_seed
                .wrapping_add(hash_str(R::get_name()));
            trace!("creating new RNG (seed={seed}) for {}", R::get_name());
            SmallRng::seed_from_u64(seed)
        })
    })
}

pub trait ContextRandomExt {
    /// Sets the base seed and drops every stream, so each is re-seeded on its next use.
    fn init_random(&mut self, base_seed: u64);

    /// Runs `sampler` on the stream named by `rng_id`.
    ///
    /// # Panics
    /// Panics if `init_random` was not called yet.
    fn sample<R: RngId, T>(&self, rng_id: R, sampler: impl FnOnce(&mut SmallRng) -> T) -> T;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("seeding random streams from {base_seed}");
        let data_container = self.get_data_container_mut(RngPlugin);
        data_container.base_seed = base_seed;
        data_container.streams.get_mut().clear();
    }

    fn sample<R: RngId, T>(&self, _rng_id: R, sampler: impl FnOnce(&mut SmallRng) -> T) -> T {
        sampler(&mut get_rng::<R>(self))
    }
}

#[cfg(test)]
mod test {
    use crate::context::Context;
    use crate::define_rng;
    use crate::rand::RngCore;
    use crate::random::context_ext::ContextRandomExt;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_rng_basic() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample(FooRng, RngCore::next_u64),
            context.sample(FooRng, RngCore::next_u64)
        );
    }

    #[test]
    #[should_panic(expected = "You must initialize the random number generator with a base seed")]
    fn sample_without_init() {
        let context = Context::new();
        context.sample(FooRng, RngCore::next_u64);
    }

    #[test]
    fn multiple_rng_types() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample(FooRng, RngCore::next_u64),
            context.sample(BarRng, RngCore::next_u64)
        );
    }

    #[test]
    fn reset_seed() {
        let mut context = Context::new();
        context.init_random(42);

        let run_0 = context.sample(FooRng, RngCore::next_u64);
        let run_1 = context.sample(FooRng, RngCore::next_u64);

        // Reset with same seed, ensure we get the same values
        context.init_random(42);
        assert_eq!(run_0, context.sample(FooRng, RngCore::next_u64));
        assert_eq!(run_1, context.sample(FooRng, RngCore::next_u64));

        // Reset with different seed, ensure we get different values
        context.init_random(88);
        assert_ne!(run_0, context.sample(FooRng, RngCore::next_u64));
        assert_ne!(run_1, context.sample(FooRng, RngCore::next_u64));
    }
}
