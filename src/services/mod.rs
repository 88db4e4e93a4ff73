pub mod status;
pub mod switch;

pub use status::{
    display_value, mask_secret, ConfigKind, ConfigResolver, ConfigSource, EffectiveConfig,
    VarReport, FIXED_MASK,
};
pub use switch::{ApplyOutcome, ApplyPhase, ConfigApplier, RESTART_ADVISORY};
