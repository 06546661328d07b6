//! Named random number streams.
//!
//! Each stream is a `SmallRng` keyed by a marker type declared with [`define_rng!`]. A stream is
//! seeded the first time it is sampled, from the base seed given to `init_random` plus a hash of
//! its name, so streams are independent of one another and of the order they are first used in.
mod context_ext;
mod macros;
mod sampling_algorithms;

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;
pub use sampling_algorithms::choose_weighted;

use crate::define_data_plugin;
use crate::rand::rngs::SmallRng;

/// Marker for a named random stream. Implemented by [`define_rng!`].
pub trait RngId: Copy + 'static {
    fn get_name() -> &'static str;
}

struct RngData {
    base_seed: u64,
    // Behind a `RefCell` so sampling only needs `&Context`.
    streams: RefCell<HashMap<TypeId, SmallRng>>,
}

define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        streams: RefCell::new(HashMap::new()),
    }
);
