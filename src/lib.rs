//! Node-side configuration synchronization agent.
//!
//! `confsync` fetches a named configuration bundle from the cluster
//! configuration service, activates it atomically on the local node, and
//! triggers a convergence run of the configuration-management engine. A
//! run leaves the node either on its previous, fully working configuration
//! or cleanly on the new one, never partially extracted or partially
//! linked.

pub mod acquire;
pub mod activate;
pub mod config;
pub mod converge;
pub mod error;
pub mod locate;
pub mod pipeline;
