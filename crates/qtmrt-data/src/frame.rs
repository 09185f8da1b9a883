use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;

use crate::component::{
    self, AnalogData, BodyShape, CameraMarkers, Decoded, Image, PlateForces, Samples,
};
use crate::error::{DecodeError, Result};
use crate::layout::{
    AnalogDeviceSingle, Body6d, ComponentCount, ComponentHeader, DataPrefix, Force,
    ForcePlateSingle, GazeSample, Marker3dNoLabel, Marker3dNoLabelResidual, Marker3dResidual,
    PupilDiameter, RateInfo, Record, RecordReader, Segment, Timecode, Vec3,
};

type Counted<T> = Result<Option<Decoded<ComponentCount, T>>>;
type Rated<T> = Result<Option<Decoded<RateInfo, T>>>;

/// Component type tags found in a data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u32)]
pub enum ComponentType {
    Markers3d = 1,
    Markers3dNoLabels = 2,
    Analog = 3,
    Force = 4,
    Bodies6d = 5,
    Bodies6dEuler = 6,
    Markers2d = 7,
    Markers2dLinearized = 8,
    Markers3dResidual = 9,
    Markers3dNoLabelsResidual = 10,
    Bodies6dResidual = 11,
    Bodies6dEulerResidual = 12,
    AnalogSingle = 13,
    Image = 14,
    ForceSingle = 15,
    GazeVector = 16,
    Timecode = 17,
    Skeleton = 18,
    EyeTracker = 19,
}

impl ComponentType {
    pub const ALL: [ComponentType; 19] = [
        ComponentType::Markers3d,
        ComponentType::Markers3dNoLabels,
        ComponentType::Analog,
        ComponentType::Force,
        ComponentType::Bodies6d,
        ComponentType::Bodies6dEuler,
        ComponentType::Markers2d,
        ComponentType::Markers2dLinearized,
        ComponentType::Markers3dResidual,
        ComponentType::Markers3dNoLabelsResidual,
        ComponentType::Bodies6dResidual,
        ComponentType::Bodies6dEulerResidual,
        ComponentType::AnalogSingle,
        ComponentType::Image,
        ComponentType::ForceSingle,
        ComponentType::GazeVector,
        ComponentType::Timecode,
        ComponentType::Skeleton,
        ComponentType::EyeTracker,
    ];

    pub fn from_u32(value: u32) -> Option<ComponentType> {
        ComponentType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_u32() == value)
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Name used for this component in stream and frame requests.
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Markers3d => "3d",
            ComponentType::Markers3dNoLabels => "3dnolabels",
            ComponentType::Analog => "analog",
            ComponentType::Force => "force",
            ComponentType::Bodies6d => "6d",
            ComponentType::Bodies6dEuler => "6deuler",
            ComponentType::Markers2d => "2d",
            ComponentType::Markers2dLinearized => "2dlin",
            ComponentType::Markers3dResidual => "3dres",
            ComponentType::Markers3dNoLabelsResidual => "3dnolabelsres",
            ComponentType::Bodies6dResidual => "6dres",
            ComponentType::Bodies6dEulerResidual => "6deulerres",
            ComponentType::AnalogSingle => "analogsingle",
            ComponentType::Image => "image",
            ComponentType::ForceSingle => "forcesingle",
            ComponentType::GazeVector => "gazevector",
            ComponentType::Timecode => "timecode",
            ComponentType::Skeleton => "skeleton",
            ComponentType::EyeTracker => "eyetracker",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name == "skeleton:global" {
            return Ok(ComponentType::Skeleton);
        }
        ComponentType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| format!("{s} is not a valid component"))
    }
}

/// One measurement frame with its components located but not decoded.
///
/// Component bodies are decoded on demand by the `get_*` accessors. A
/// component that is not in the frame yields `Ok(None)`.
#[derive(Debug, Clone)]
pub struct DataFrame {
    payload: Bytes,
    timestamp: i64,
    frame_number: u32,
    components: BTreeMap<ComponentType, usize>,
}

impl DataFrame {
    /// Parse the prefix and walk the component headers of a data frame payload.
    ///
    /// Components with unknown type tags are skipped (logged) so that newer
    /// servers can add components without breaking older clients.
    pub fn parse(payload: Bytes) -> Result<Self> {
        let mut reader = RecordReader::new(&payload, 0);
        let prefix: DataPrefix = reader.read()?;

        let mut components = BTreeMap::new();
        for _ in 0..prefix.component_count {
            let start = reader.offset();
            let header: ComponentHeader = reader.read()?;
            if (header.size as usize) < ComponentHeader::SIZE {
                return Err(DecodeError::InvalidComponentSize {
                    offset: start,
                    size: header.size,
                });
            }

            match ComponentType::from_u32(header.type_tag) {
                Some(kind) => {
                    components.insert(kind, reader.offset());
                }
                None => tracing::warn!(
                    type_tag = header.type_tag,
                    offset = start,
                    "skipping unknown component"
                ),
            }
            reader = RecordReader::new(&payload, start.saturating_add(header.size as usize));
        }

        Ok(Self {
            timestamp: prefix.timestamp,
            frame_number: prefix.frame_number,
            components,
            payload,
        })
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    /// Raw payload the frame was parsed from.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Located components and the offset of each body (just past its header).
    pub fn components(&self) -> &BTreeMap<ComponentType, usize> {
        &self.components
    }

    pub fn has(&self, kind: ComponentType) -> bool {
        self.components.contains_key(&kind)
    }

    fn offset(&self, kind: ComponentType) -> Option<usize> {
        self.components.get(&kind).copied()
    }

    fn decode<T>(
        &self,
        kind: ComponentType,
        decode: impl FnOnce(&[u8], usize) -> Result<T>,
    ) -> Result<Option<T>> {
        match self.offset(kind) {
            Some(offset) => decode(&self.payload[..], offset).map(Some),
            None => Ok(None),
        }
    }

    /// 2D markers per camera. `camera` selects a single camera by its
    /// 1-based camera number; the other cameras are skipped.
    pub fn get_2d_markers(&self, camera: Option<usize>) -> Rated<CameraMarkers> {
        self.decode(ComponentType::Markers2d, |data, offset| {
            component::decode_2d(data, offset, camera)
        })
    }

    pub fn get_2d_markers_linearized(&self, camera: Option<usize>) -> Rated<CameraMarkers> {
        self.decode(ComponentType::Markers2dLinearized, |data, offset| {
            component::decode_2d(data, offset, camera)
        })
    }

    pub fn get_3d_markers(&self) -> Rated<Vec3> {
        self.decode(ComponentType::Markers3d, component::decode_3d::<Vec3>)
    }

    pub fn get_3d_markers_residual(&self) -> Rated<Marker3dResidual> {
        self.decode(
            ComponentType::Markers3dResidual,
            component::decode_3d::<Marker3dResidual>,
        )
    }

    pub fn get_3d_markers_no_label(&self) -> Rated<Marker3dNoLabel> {
        self.decode(
            ComponentType::Markers3dNoLabels,
            component::decode_3d::<Marker3dNoLabel>,
        )
    }

    pub fn get_3d_markers_no_label_residual(&self) -> Rated<Marker3dNoLabelResidual> {
        self.decode(
            ComponentType::Markers3dNoLabelsResidual,
            component::decode_3d::<Marker3dNoLabelResidual>,
        )
    }

    pub fn get_6d(&self) -> Rated<Body6d> {
        self.decode(ComponentType::Bodies6d, |data, offset| {
            component::decode_6d(data, offset, BodyShape::MATRIX)
        })
    }

    pub fn get_6d_residual(&self) -> Rated<Body6d> {
        self.decode(ComponentType::Bodies6dResidual, |data, offset| {
            component::decode_6d(data, offset, BodyShape::MATRIX_RESIDUAL)
        })
    }

    pub fn get_6d_euler(&self) -> Rated<Body6d> {
        self.decode(ComponentType::Bodies6dEuler, |data, offset| {
            component::decode_6d(data, offset, BodyShape::EULER)
        })
    }

    pub fn get_6d_euler_residual(&self) -> Rated<Body6d> {
        self.decode(ComponentType::Bodies6dEulerResidual, |data, offset| {
            component::decode_6d(data, offset, BodyShape::EULER_RESIDUAL)
        })
    }

    pub fn get_analog(&self) -> Counted<AnalogData> {
        self.decode(ComponentType::Analog, component::decode_analog)
    }

    pub fn get_analog_single(&self) -> Counted<(AnalogDeviceSingle, Vec<f32>)> {
        self.decode(ComponentType::AnalogSingle, component::decode_analog_single)
    }

    pub fn get_force(&self) -> Counted<PlateForces> {
        self.decode(ComponentType::Force, component::decode_force)
    }

    pub fn get_force_single(&self) -> Counted<(ForcePlateSingle, Force)> {
        self.decode(ComponentType::ForceSingle, component::decode_force_single)
    }

    pub fn get_gaze_vectors(&self) -> Counted<Samples<GazeSample>> {
        self.decode(
            ComponentType::GazeVector,
            component::decode_samples::<GazeSample>,
        )
    }

    pub fn get_eye_trackers(&self) -> Counted<Samples<PupilDiameter>> {
        self.decode(
            ComponentType::EyeTracker,
            component::decode_samples::<PupilDiameter>,
        )
    }

    /// Images with their raw bytes, sliced from the payload without copying.
    pub fn get_images(&self) -> Counted<Image> {
        match self.offset(ComponentType::Image) {
            Some(offset) => component::decode_images(&self.payload, offset).map(Some),
            None => Ok(None),
        }
    }

    /// Skeletons, each as its list of segments.
    pub fn get_skeletons(&self) -> Counted<Vec<Segment>> {
        self.decode(ComponentType::Skeleton, component::decode_skeletons)
    }

    pub fn get_timecodes(&self) -> Counted<Timecode> {
        self.decode(ComponentType::Timecode, component::decode_timecodes)
    }
}
