//! Data structures for choreography documents.

pub mod spec;

pub use spec::{
    ChoreographySpec, LinkSpec, ParamValue, ParametersSpec, RefSpec, RuleSpec, SpecError,
    TargetSpec, TriggerSpec,
};
