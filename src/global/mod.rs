//! Distributed vectors over subdomains connected by gates.
//!
//! Every rank owns a local vector for its subdomain. Entries on subdomain interfaces exist on
//! several ranks; a [`Gate`] exchanges them with the neighbouring ranks and turns local reductions
//! into global ones.
mod comm;
mod gate;
mod ticket;
mod vector;

pub use comm::{allreduce, Comm, CommError, InProcessComm, ReduceOp, SerialComm};
pub use gate::Gate;
pub use ticket::{ScalarTicket, VectorTicket};
pub use vector::GlobalVector;
