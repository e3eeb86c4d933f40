pub mod official;
pub mod p2p;
pub mod util;

pub use official::OfficialRateSource;
pub use p2p::P2pRateSource;
