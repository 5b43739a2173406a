#![forbid(unsafe_code)]

//! WASM host runner for the accordion controller.
//!
//! This crate provides [`AccordionRunner`], a `wasm-bindgen`-exported struct
//! that wraps `accordion_core::AccordionController` over an in-memory copy
//! of the host document and exposes it to JavaScript for host-driven
//! execution.
//!
//! The JS side snapshots its document once (see [`snapshot`]), forwards
//! clicks, resizes, and `transitionend` events by node id, advances time,
//! and applies the drained class/style patches to the real DOM.

pub mod snapshot;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::AccordionRunner;

// Runner core is used by the wasm module and by native tests.
#[cfg(any(target_arch = "wasm32", test))]
mod runner_core;
