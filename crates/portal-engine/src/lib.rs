#![forbid(unsafe_code)]

//! Core protocol for composing sandboxed UI components across isolated
//! execution contexts.
//!
//! Components render trees that are serialized into a transmissible,
//! host-element-only form; nested components become independent contexts
//! reachable only through typed message envelopes. Function props never
//! cross a boundary by value: they are registered locally and replaced by
//! opaque method references, invoked later through a request/response
//! correlation layer.
//!
//! The crate is transport-agnostic and logically single-threaded: hosts
//! plug in a [`transport::Transport`] and drive each
//! [`container::Container`] one message at a time.

pub mod callback_registry;
pub mod compile_cache;
pub mod component_id;
pub mod container;
pub mod correlation;
pub mod diagnostics;
pub mod envelope;
pub mod error;
pub mod json_string;
pub mod node;
pub mod prop_codec;
pub mod serializer;
pub mod transport;
