mod environment;
mod specification;
mod physics;
mod policy;
mod observer;
mod history;
mod fitness;
mod vehicle;

pub use environment::*;
pub use specification::*;
pub use physics::*;
pub use policy::*;
pub use observer::*;
pub use history::*;
pub use fitness::*;
pub use vehicle::*;
