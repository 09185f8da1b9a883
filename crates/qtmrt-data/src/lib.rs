//! Data frame decoding for the QTM real-time protocol.
//!
//! A data frame payload is a small prefix followed by a list of components.
//! [`DataFrame::parse`] only locates the components; each `get_*` accessor
//! decodes one component on demand.
//!
//! ```no_run
//! # fn demo(payload: bytes::Bytes) -> qtmrt_data::Result<()> {
//! let frame = qtmrt_data::DataFrame::parse(payload)?;
//! if let Some(markers) = frame.get_3d_markers()? {
//!     println!("frame {} has {} markers", frame.frame_number(), markers.items.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod component;
pub mod error;
pub mod frame;
pub mod layout;

#[cfg(test)]
mod testutil;

pub use component::{
    AnalogData, BodyShape, CameraMarkers, Decoded, Image, PlateForces, Samples,
};
pub use error::{DecodeError, Result};
pub use frame::{ComponentType, DataFrame};
pub use layout::{
    AnalogDevice, AnalogDeviceSingle, Body6d, Camera2d, ComponentCount, Euler, Force, ForcePlate,
    ForcePlateSingle, GazeSample, ImageFormat, ImageHeader, Marker2d, Marker3dNoLabel,
    Marker3dNoLabelResidual, Marker3dResidual, Orientation, PupilDiameter, Quaternion, RateInfo,
    RotationMatrix, SampleInfo, Segment, Timecode, Vec3,
};
