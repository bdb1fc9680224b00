//! # Method Registry and Invocation
//!
//! Catalog introspection into an in-memory registry of stored-function
//! descriptors, and the invocation path from (method, arguments) to a
//! shaped result.

pub mod catalog;
pub mod errors;
pub mod invoker;
pub mod method;
pub mod registry;
pub mod shape;
pub mod sql;

pub use catalog::{CatalogConfig, CatalogLoader};
pub use errors::{rpc_codes, FunctionError, FunctionResult};
pub use invoker::{Invocation, InvocationContext, Invoker, InvokerConfig};
pub use method::{InputArg, Method, OutputArg};
pub use registry::{MethodRegistry, Snapshot};
pub use sql::{build_call, quote_ident, CallShape, CallStatement};
