//! Behavioural suites for the Event Manager daemon.

mod fanout_behaviour;
mod support;
