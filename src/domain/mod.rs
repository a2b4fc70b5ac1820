//! Domain model: purchases, the ledger, loyalty tiers, destinations and the
//! ports agents talk to the outside world through.

pub mod delivery;
pub mod destination;
pub mod ledger;
pub mod loyalty;
pub mod ports;
pub mod purchase;
