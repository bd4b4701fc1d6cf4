//! Runtime error types.

use sim_component::SignatureError;

use crate::strategy::FilterStrategy;

/// An invalid system declaration, caught when the system is added to a
/// scheduler and fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The filter strategy derives its match set from a signature, but the
    /// system declares none.
    #[error("system `{system}` uses {strategy:?} but declares no signature")]
    MissingSignature {
        /// The offending system.
        system: String,
        /// Its filter strategy.
        strategy: FilterStrategy,
    },

    /// The declared signature is malformed.
    #[error("system `{system}` has an invalid signature")]
    Signature {
        /// The offending system.
        system: String,
        /// What is wrong with the signature.
        #[source]
        source: SignatureError,
    },
}
