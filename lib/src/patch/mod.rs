//! Patch a batch of client classes
//!
//! [`Patcher::patch`] decodes every class, then runs these passes over the whole batch, in order:
//!
//!   1. [`Pass::ShiftMask`] masks constant shift distances down to the bits the JVM reads
//!   2. [`Pass::PlatformFix`] swaps the right click check in mouse handlers for one that works
//!      on JDK 9 and up
//!   3. [`Pass::DeadMath`] removes arithmetic stored into locals nobody reads
//!   4. [`Pass::OpaquePredicates`] turns branches on the sentinel field into `goto`s
//!   5. [`Pass::KeyReplacement`] swaps the embedded RSA key
//!   6. [`Pass::MethodVariants`] turns method variants into forwarders
//!
//! Every class is then verified (unless disabled), renamed, and encoded again.
//!
//! Problems a pass can work around are collected as [`Warning`]s. Anything else aborts the run
//! with an [`Error`].

mod context;
mod dead_math;
mod errors;
mod key_replacement;
mod method_variants;
mod opaque_predicates;
mod pipeline;
mod platform_fix;
mod remapper;
mod settings;
mod shift_mask;

pub use context::*;
pub use dead_math::remove_dead_stores;
pub use errors::*;
pub use key_replacement::replace_literal;
pub use method_variants::forward_variant;
pub use opaque_predicates::simplify_code;
pub use pipeline::*;
pub use platform_fix::replace_calls;
pub use remapper::*;
pub use settings::*;
pub use shift_mask::mask_code;
