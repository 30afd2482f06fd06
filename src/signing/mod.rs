//! Link and webhook signing.
//!
//! Everything that touches the shared secret between the bot and the form
//! backend lives here: tracking tokens bound to a chat id and issue time,
//! keyed hashes over raw webhook bodies, and the tracking links that carry
//! the tokens.

mod header;
mod link;
mod token;

pub use header::{SIGNATURE_ALGORITHM, SignatureHeaderError, format_signature_header, parse_signature_header};
pub use link::{TrackingLinks, append_query};
pub use token::{DEFAULT_TOKEN_TTL, LinkSigner, SignedToken, now_unix};
