//! UI module root: exposes drawing functions for individual panels.

pub mod alerts;
pub mod charts;
pub mod display;
pub mod header;
pub mod processes;
pub mod theme;
pub mod util;
