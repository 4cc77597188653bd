//! Adapter definitions
//!
//! Turns an adapter kind plus options into something the registry can build.

pub mod factory;

pub use factory::{
    AdapterConstructor, AdapterDefinition, AdapterDefinitionFactory, AdapterOptions,
    parse_options,
};
