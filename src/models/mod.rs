//! Data model for pechas: spans, annotations, layers and base texts.

mod annotation;
mod bbox;
mod layer;
mod metadata;
mod pecha;
mod unit;

pub use annotation::{Annotation, AnnotationAttributes, Span};
pub use bbox::BBox;
pub(crate) use layer::layer_mut;
pub use layer::{Layer, LayerKind, LayerSet, DEFAULT_REVISION};
pub use metadata::{
    generate_pecha_id, BaseInfo, Copyright, CopyrightStatus, InitialCreationType, LicenseType,
    MetadataError, MetadataInit, PechaMetadata,
};
pub use pecha::Pecha;
pub use unit::{BaseUnit, SpanViolation};
