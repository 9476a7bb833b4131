pub mod credentials;
pub mod policy;
pub mod session;
pub mod validation;

pub use credentials::*;
pub use policy::*;
pub use session::*;
pub use validation::*;
