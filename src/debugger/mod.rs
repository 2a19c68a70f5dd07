pub mod address;
pub mod classify;
pub mod error;
pub mod identity;
pub mod query;
pub mod session;
pub mod variable;

pub use address::Address;
pub use classify::ObjectKind;
pub use error::Error;
pub use identity::TypeIdentity;
pub use query::{QueryError, RuntimeApi, Target, TypedResult};
pub use session::{full_summary, summary, Session};
pub use variable::provider::{Child, ChildValue, ValueProvider};
pub use variable::value::{ScalarKind, SupportedScalar};
pub use variable::{ObjectHandle, StaticType};
