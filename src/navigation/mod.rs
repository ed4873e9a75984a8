//! Navigation
//!
//! Two ways a spoken command becomes a client route:
//!
//! - `router`: a static keyword table for direct commands ("open invoices")
//! - `target`: typed targets built by the backend "navigate" tool, which are
//!   then dispatched to the client as `NavigationCommand`s

pub mod router;
pub mod target;

pub use router::{extract_entity_from_command, get_route_from_command, ROUTE_TABLE};
pub use target::NavigationTarget;
