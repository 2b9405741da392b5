//! # Architecture Ports
//!
//! Hardware abstraction boundary. One port per supported core;
//! currently the Cortex-M4 port only.

pub mod cortex_m4;
