mod ids;
mod location;
mod organization;
mod tag;

pub use ids::*;
pub use location::*;
pub use organization::*;
pub use tag::*;
