/// Declares a marker type naming an independent random stream, for use with
/// `ContextRandomExt::sample`.
///
/// ```
/// use epistate::{define_rng, Context, ContextRandomExt};
/// use epistate::rand::Rng;
///
/// define_rng!(ExposureRng);
///
/// let mut context = Context::new();
/// context.init_random(7);
/// let roll: f64 = context.sample(ExposureRng, |rng| rng.random());
/// assert!((0.0..1.0).contains(&roll));
/// ```
#[macro_export]
macro_rules! define_rng {
    ($random_id:ident) => {
        #[derive(Copy, Clone)]
        pub struct $random_id;

        impl $crate::random::RngId for $random_id {
            fn get_name() -> &'static str {
                stringify!($random_id)
            }
        }

        // Two streams with the same name would share a seed; make that a link error.
        $crate::paste::paste! {
            #[doc(hidden)]
            #[no_mangle]
            #[allow(non_upper_case_globals)]
            pub static [<rng_name_duplication_guard_ $random_id>]: () = ();
        }
    };
}
pub use define_rng;
