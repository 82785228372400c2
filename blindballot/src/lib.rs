#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

mod account;
mod authority;
mod ballot;
mod credential;
mod error;
mod factory;
mod ledger;
mod relay;
mod serde_hex;
mod shared;
mod sponsor;
mod tally;
mod transaction;
mod util;

pub use account::*;
pub use authority::*;
pub use ballot::*;
pub use credential::*;
pub use error::*;
pub use factory::*;
pub use ledger::*;
pub use relay::*;
pub use serde_hex::*;
pub use shared::*;
pub use sponsor::*;
pub use tally::*;
pub use transaction::*;
pub use util::*;

/// The RSA big integer type used throughout the credential protocol
pub use rsa::BigUint;
