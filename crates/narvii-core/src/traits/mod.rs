//! Port traits - what the dispatch core needs from the outside world

mod gateway;

pub use gateway::RequestGateway;
