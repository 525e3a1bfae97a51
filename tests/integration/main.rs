//! Integration tests for khoj-nav against the simulated robot
//!
//! Each test builds a [`Robot`](khoj_nav::Robot) with sped-up motion
//! constants so full runs finish in well under a second or two.
//!
//! ```bash
//! cargo test --test integration -- --nocapture
//! ```

mod commands;
mod faults;
mod harness;
mod kill_switch;
mod searches;
