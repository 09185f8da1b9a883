//! Per-component decode routines.
//!
//! Every routine starts at the offset just past a component header, reads the
//! component's own count header, then loops over its records. The returned
//! [`Decoded::end`] is the offset right after the last byte consumed.

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;
use crate::layout::{
    AnalogDevice, AnalogDeviceSingle, Body6d, Camera2d, ComponentCount, Euler, FloatBlock, Force,
    ForcePlate, ForcePlateSingle, ImageHeader, Marker2d, Orientation, RateInfo, Record,
    RecordReader, RotationMatrix, SampleInfo, SampleNumber, Segment, Timecode, Vec3,
};

/// A decoded component: its count header, the records, and the end offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded<H, T> {
    pub header: H,
    pub items: Vec<T>,
    #[serde(skip)]
    pub end: usize,
}

/// Markers seen by one camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraMarkers {
    pub status_flag: u8,
    pub markers: Vec<Marker2d>,
}

/// Decode a 2D (or linearized 2D) component.
///
/// With `camera` set, only that camera (1-based) is returned; the marker
/// bytes of every other camera are skipped but still counted in `end`.
pub fn decode_2d(
    data: &[u8],
    offset: usize,
    camera: Option<usize>,
) -> Result<Decoded<RateInfo, CameraMarkers>> {
    let mut reader = RecordReader::new(data, offset);
    let header: RateInfo = reader.read()?;

    let mut items = Vec::new();
    for number in 1..=header.count as usize {
        let info: Camera2d = reader.read()?;
        if camera.is_none_or(|wanted| wanted == number) {
            items.push(CameraMarkers {
                status_flag: info.status_flag,
                markers: reader.read_many(info.marker_count)?,
            });
        } else {
            reader.skip::<Marker2d>(info.marker_count)?;
        }
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

/// Decode any of the four 3D marker components; `R` picks the record shape.
pub fn decode_3d<R: Record>(data: &[u8], offset: usize) -> Result<Decoded<RateInfo, R>> {
    let mut reader = RecordReader::new(data, offset);
    let header: RateInfo = reader.read()?;
    let items = reader.read_many(header.count)?;
    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

/// Which of the four 6D record shapes a component carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyShape {
    euler: bool,
    residual: bool,
}

impl BodyShape {
    pub const MATRIX: BodyShape = BodyShape {
        euler: false,
        residual: false,
    };
    pub const MATRIX_RESIDUAL: BodyShape = BodyShape {
        euler: false,
        residual: true,
    };
    pub const EULER: BodyShape = BodyShape {
        euler: true,
        residual: false,
    };
    pub const EULER_RESIDUAL: BodyShape = BodyShape {
        euler: true,
        residual: true,
    };
}

struct Residual(f32);

impl Record for Residual {
    const SIZE: usize = 4;
    const NAME: &'static str = "residual";

    fn parse(buf: &mut &[u8]) -> Self {
        Residual(bytes::Buf::get_f32_le(buf))
    }
}

pub fn decode_6d(
    data: &[u8],
    offset: usize,
    shape: BodyShape,
) -> Result<Decoded<RateInfo, Body6d>> {
    let mut reader = RecordReader::new(data, offset);
    let header: RateInfo = reader.read()?;

    let mut items = Vec::new();
    for _ in 0..header.count {
        let position: Vec3 = reader.read()?;
        let orientation = if shape.euler {
            Orientation::Euler(reader.read::<Euler>()?)
        } else {
            Orientation::Matrix(reader.read::<RotationMatrix>()?)
        };
        let residual = if shape.residual {
            Some(reader.read::<Residual>()?.0)
        } else {
            None
        };
        items.push(Body6d {
            position,
            orientation,
            residual,
        });
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

/// One analog device: `channels[c]` holds `sample_count` samples of channel `c`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalogData {
    pub device: AnalogDevice,
    pub sample_number: Option<u32>,
    pub channels: Vec<Vec<f32>>,
}

/// Decode the multi-device analog component.
///
/// The channel block width is the device's `sample_count`, so the block
/// decoder is built per device after its header is read.
pub fn decode_analog(data: &[u8], offset: usize) -> Result<Decoded<ComponentCount, AnalogData>> {
    let mut reader = RecordReader::new(data, offset);
    let header: ComponentCount = reader.read()?;

    let mut items = Vec::new();
    for _ in 0..header.count {
        let device: AnalogDevice = reader.read()?;
        if device.sample_count == 0 {
            items.push(AnalogData {
                device,
                sample_number: None,
                channels: Vec::new(),
            });
            continue;
        }

        let sample_number: SampleNumber = reader.read()?;
        let block = FloatBlock::new(device.sample_count);
        let mut channels = Vec::new();
        for _ in 0..device.channel_count {
            channels.push(block.read(&mut reader)?);
        }
        items.push(AnalogData {
            device,
            sample_number: Some(sample_number.0),
            channels,
        });
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

/// Decode the single-sample analog component: one value per channel.
pub fn decode_analog_single(
    data: &[u8],
    offset: usize,
) -> Result<Decoded<ComponentCount, (AnalogDeviceSingle, Vec<f32>)>> {
    let mut reader = RecordReader::new(data, offset);
    let header: ComponentCount = reader.read()?;

    let mut items = Vec::new();
    for _ in 0..header.count {
        let device: AnalogDeviceSingle = reader.read()?;
        let values = FloatBlock::new(device.channel_count).read(&mut reader)?;
        items.push((device, values));
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateForces {
    pub plate: ForcePlate,
    pub forces: Vec<Force>,
}

pub fn decode_force(data: &[u8], offset: usize) -> Result<Decoded<ComponentCount, PlateForces>> {
    let mut reader = RecordReader::new(data, offset);
    let header: ComponentCount = reader.read()?;

    let mut items = Vec::new();
    for _ in 0..header.count {
        let plate: ForcePlate = reader.read()?;
        let forces = reader.read_many(plate.force_count)?;
        items.push(PlateForces { plate, forces });
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

pub fn decode_force_single(
    data: &[u8],
    offset: usize,
) -> Result<Decoded<ComponentCount, (ForcePlateSingle, Force)>> {
    let mut reader = RecordReader::new(data, offset);
    let header: ComponentCount = reader.read()?;

    let mut items = Vec::new();
    for _ in 0..header.count {
        let plate: ForcePlateSingle = reader.read()?;
        let force: Force = reader.read()?;
        items.push((plate, force));
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

/// Samples from one gaze vector or eye tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Samples<T> {
    pub info: SampleInfo,
    pub samples: Vec<T>,
}

/// Decode a gaze vector or eye tracker component; `T` picks the sample shape.
pub fn decode_samples<T: Record>(
    data: &[u8],
    offset: usize,
) -> Result<Decoded<ComponentCount, Samples<T>>> {
    let mut reader = RecordReader::new(data, offset);
    let header: ComponentCount = reader.read()?;

    let mut items = Vec::new();
    for _ in 0..header.count {
        let info: SampleInfo = reader.read()?;
        let samples = reader.read_many(info.sample_count)?;
        items.push(Samples { info, samples });
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

/// One camera image. `data` is the opaque encoded image, `image_size` bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub header: ImageHeader,
    #[serde(skip)]
    pub data: Bytes,
}

pub fn decode_images(payload: &Bytes, offset: usize) -> Result<Decoded<ComponentCount, Image>> {
    let mut reader = RecordReader::new(payload, offset);
    let header: ComponentCount = reader.read()?;

    let mut items = Vec::new();
    for _ in 0..header.count {
        let image: ImageHeader = reader.read()?;
        let range = reader.take_bytes(image.image_size as usize)?;
        items.push(Image {
            header: image,
            data: payload.slice(range),
        });
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

/// Decode skeletons; each item is the segment list of one skeleton.
pub fn decode_skeletons(
    data: &[u8],
    offset: usize,
) -> Result<Decoded<ComponentCount, Vec<Segment>>> {
    let mut reader = RecordReader::new(data, offset);
    let header: ComponentCount = reader.read()?;

    let mut items = Vec::new();
    for _ in 0..header.count {
        let segments: ComponentCount = reader.read()?;
        items.push(reader.read_many(segments.count)?);
    }

    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}

pub fn decode_timecodes(data: &[u8], offset: usize) -> Result<Decoded<ComponentCount, Timecode>> {
    let mut reader = RecordReader::new(data, offset);
    let header: ComponentCount = reader.read()?;
    let items = reader.read_many(header.count)?;
    Ok(Decoded {
        header,
        items,
        end: reader.offset(),
    })
}
