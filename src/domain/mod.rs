pub mod charge_station;
pub mod connector;
pub mod group;
pub mod ids;
pub mod membership;
pub mod validation;

pub use charge_station::*;
pub use connector::*;
pub use group::*;
pub use ids::*;
pub use membership::*;
