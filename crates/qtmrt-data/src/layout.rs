//! Fixed-size record layouts used inside data frames.
//!
//! All multi-byte values are little-endian. Every record knows its exact wire
//! size; variable-length bodies are described by [`FloatBlock`], whose size is
//! only known once an earlier count has been decoded.

use bytes::Buf;
use serde::Serialize;

use crate::error::{DecodeError, Result};

/// A record with a fixed wire size.
pub trait Record: Sized {
    /// Exact encoded size in bytes.
    const SIZE: usize;
    /// Short name used in error messages.
    const NAME: &'static str;

    /// Parse one record. `buf` is guaranteed to hold at least `SIZE` bytes.
    fn parse(buf: &mut &[u8]) -> Self;
}

/// Bounds-checked cursor over a frame payload.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    /// Current byte offset into the payload.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the current offset.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    fn ensure(&self, record: &'static str, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                record,
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read one fixed-size record.
    pub fn read<R: Record>(&mut self) -> Result<R> {
        self.ensure(R::NAME, R::SIZE)?;
        let mut buf = &self.data[self.offset..self.offset + R::SIZE];
        let record = R::parse(&mut buf);
        self.offset += R::SIZE;
        Ok(record)
    }

    /// Read `count` consecutive records of the same shape.
    pub fn read_many<R: Record>(&mut self, count: u32) -> Result<Vec<R>> {
        let needed = (count as usize)
            .checked_mul(R::SIZE)
            .unwrap_or(usize::MAX);
        self.ensure(R::NAME, needed)?;
        (0..count).map(|_| self.read::<R>()).collect()
    }

    /// Take `len` raw bytes, returning their range in the payload.
    pub fn take_bytes(&mut self, len: usize) -> Result<std::ops::Range<usize>> {
        self.ensure("raw bytes", len)?;
        let start = self.offset;
        self.offset += len;
        Ok(start..self.offset)
    }

    /// Skip `count` records of type `R` without decoding them.
    pub fn skip<R: Record>(&mut self, count: u32) -> Result<()> {
        let needed = (count as usize)
            .checked_mul(R::SIZE)
            .unwrap_or(usize::MAX);
        self.ensure(R::NAME, needed)?;
        self.offset += needed;
        Ok(())
    }
}

/// A block of `len` little-endian `f32` values whose length comes from an
/// earlier-decoded count (analog channel samples).
#[derive(Debug, Clone, Copy)]
pub struct FloatBlock {
    len: u32,
}

impl FloatBlock {
    pub fn new(len: u32) -> Self {
        Self { len }
    }

    /// Encoded size of one block.
    pub fn size(&self) -> usize {
        self.len as usize * 4
    }

    pub fn read(&self, reader: &mut RecordReader<'_>) -> Result<Vec<f32>> {
        let values: Vec<Float> = reader.read_many(self.len)?;
        Ok(values.into_iter().map(|v| v.0).collect())
    }
}

struct Float(f32);

impl Record for Float {
    const SIZE: usize = 4;
    const NAME: &'static str = "float sample";

    fn parse(buf: &mut &[u8]) -> Self {
        Float(buf.get_f32_le())
    }
}

fn floats<const N: usize>(buf: &mut &[u8]) -> [f32; N] {
    let mut out = [0.0; N];
    for value in &mut out {
        *value = buf.get_f32_le();
    }
    out
}

/// Prefix of every data frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPrefix {
    pub timestamp: i64,
    pub frame_number: u32,
    pub component_count: u32,
}

impl Record for DataPrefix {
    const SIZE: usize = 16;
    const NAME: &'static str = "data frame prefix";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            timestamp: buf.get_i64_le(),
            frame_number: buf.get_u32_le(),
            component_count: buf.get_u32_le(),
        }
    }
}

/// `(size, type)` header in front of each component; `size` includes the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentHeader {
    pub size: u32,
    pub type_tag: u32,
}

impl Record for ComponentHeader {
    const SIZE: usize = 8;
    const NAME: &'static str = "component header";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            size: buf.get_u32_le(),
            type_tag: buf.get_u32_le(),
        }
    }
}

/// Count-only component header (analog, force, gaze, eye tracker, image,
/// skeleton, timecode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentCount {
    pub count: u32,
}

impl Record for ComponentCount {
    const SIZE: usize = 4;
    const NAME: &'static str = "component count";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            count: buf.get_u32_le(),
        }
    }
}

/// Header for 2D, 3D and 6D components: an item count plus drop-rate metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateInfo {
    pub count: u32,
    pub drop_rate: u16,
    pub out_of_sync_rate: u16,
}

impl Record for RateInfo {
    const SIZE: usize = 8;
    const NAME: &'static str = "component info";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            count: buf.get_u32_le(),
            drop_rate: buf.get_u16_le(),
            out_of_sync_rate: buf.get_u16_le(),
        }
    }
}

// 2D

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Camera2d {
    pub marker_count: u32,
    pub status_flag: u8,
}

impl Record for Camera2d {
    const SIZE: usize = 5;
    const NAME: &'static str = "2d camera";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            marker_count: buf.get_u32_le(),
            status_flag: buf.get_u8(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Marker2d {
    pub x: i32,
    pub y: i32,
    pub diameter_x: i16,
    pub diameter_y: i16,
}

impl Record for Marker2d {
    const SIZE: usize = 12;
    const NAME: &'static str = "2d marker";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            x: buf.get_i32_le(),
            y: buf.get_i32_le(),
            diameter_x: buf.get_i16_le(),
            diameter_y: buf.get_i16_le(),
        }
    }
}

// 3D

/// Three floats: a position, a unit vector, or a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Record for Vec3 {
    const SIZE: usize = 12;
    const NAME: &'static str = "vector";

    fn parse(buf: &mut &[u8]) -> Self {
        let [x, y, z] = floats::<3>(buf);
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker3dResidual {
    pub position: Vec3,
    pub residual: f32,
}

impl Record for Marker3dResidual {
    const SIZE: usize = 16;
    const NAME: &'static str = "3d marker with residual";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            position: Vec3::parse(buf),
            residual: buf.get_f32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker3dNoLabel {
    pub position: Vec3,
    pub id: u32,
}

impl Record for Marker3dNoLabel {
    const SIZE: usize = 16;
    const NAME: &'static str = "unlabelled 3d marker";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            position: Vec3::parse(buf),
            id: buf.get_u32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker3dNoLabelResidual {
    pub position: Vec3,
    pub id: u32,
    pub residual: f32,
}

impl Record for Marker3dNoLabelResidual {
    const SIZE: usize = 20;
    const NAME: &'static str = "unlabelled 3d marker with residual";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            position: Vec3::parse(buf),
            id: buf.get_u32_le(),
            residual: buf.get_f32_le(),
        }
    }
}

// 6D

/// Row-major 3x3 rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RotationMatrix(pub [f32; 9]);

impl Record for RotationMatrix {
    const SIZE: usize = 36;
    const NAME: &'static str = "rotation matrix";

    fn parse(buf: &mut &[u8]) -> Self {
        RotationMatrix(floats::<9>(buf))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Euler {
    pub a1: f32,
    pub a2: f32,
    pub a3: f32,
}

impl Record for Euler {
    const SIZE: usize = 12;
    const NAME: &'static str = "euler angles";

    fn parse(buf: &mut &[u8]) -> Self {
        let [a1, a2, a3] = floats::<3>(buf);
        Self { a1, a2, a3 }
    }
}

/// Orientation of a 6D body in either of its two wire encodings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Orientation {
    Matrix(RotationMatrix),
    Euler(Euler),
}

/// One 6D body. `residual` is present only for the residual variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Body6d {
    pub position: Vec3,
    pub orientation: Orientation,
    pub residual: Option<f32>,
}

// Analog

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalogDevice {
    pub id: u32,
    pub channel_count: u32,
    pub sample_count: u32,
}

impl Record for AnalogDevice {
    const SIZE: usize = 12;
    const NAME: &'static str = "analog device";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            id: buf.get_u32_le(),
            channel_count: buf.get_u32_le(),
            sample_count: buf.get_u32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleNumber(pub u32);

impl Record for SampleNumber {
    const SIZE: usize = 4;
    const NAME: &'static str = "sample number";

    fn parse(buf: &mut &[u8]) -> Self {
        SampleNumber(buf.get_u32_le())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalogDeviceSingle {
    pub id: u32,
    pub channel_count: u32,
}

impl Record for AnalogDeviceSingle {
    const SIZE: usize = 8;
    const NAME: &'static str = "single analog device";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            id: buf.get_u32_le(),
            channel_count: buf.get_u32_le(),
        }
    }
}

// Force

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForcePlate {
    pub id: u32,
    pub force_count: u32,
    pub force_number: u32,
}

impl Record for ForcePlate {
    const SIZE: usize = 12;
    const NAME: &'static str = "force plate";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            id: buf.get_u32_le(),
            force_count: buf.get_u32_le(),
            force_number: buf.get_u32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForcePlateSingle {
    pub id: u32,
}

impl Record for ForcePlateSingle {
    const SIZE: usize = 4;
    const NAME: &'static str = "single force plate";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            id: buf.get_u32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Force {
    pub force: Vec3,
    pub moment: Vec3,
    pub application_point: Vec3,
}

impl Record for Force {
    const SIZE: usize = 36;
    const NAME: &'static str = "force";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            force: Vec3::parse(buf),
            moment: Vec3::parse(buf),
            application_point: Vec3::parse(buf),
        }
    }
}

// Gaze vectors and eye trackers

/// Per-vector / per-tracker sample header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleInfo {
    pub sample_count: u32,
    pub sample_number: u32,
}

impl Record for SampleInfo {
    const SIZE: usize = 8;
    const NAME: &'static str = "sample info";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            sample_count: buf.get_u32_le(),
            sample_number: buf.get_u32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GazeSample {
    pub unit_vector: Vec3,
    pub position: Vec3,
}

impl Record for GazeSample {
    const SIZE: usize = 24;
    const NAME: &'static str = "gaze sample";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            unit_vector: Vec3::parse(buf),
            position: Vec3::parse(buf),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PupilDiameter {
    pub left: f32,
    pub right: f32,
}

impl Record for PupilDiameter {
    const SIZE: usize = 8;
    const NAME: &'static str = "pupil diameter";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            left: buf.get_f32_le(),
            right: buf.get_f32_le(),
        }
    }
}

// Image

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    RawGrayscale,
    RawBgr,
    Jpg,
    Png,
    Unknown(u32),
}

impl From<u32> for ImageFormat {
    fn from(value: u32) -> Self {
        match value {
            0 => ImageFormat::RawGrayscale,
            1 => ImageFormat::RawBgr,
            2 => ImageFormat::Jpg,
            3 => ImageFormat::Png,
            other => ImageFormat::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageHeader {
    pub id: u32,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub left_crop: f32,
    pub top_crop: f32,
    pub right_crop: f32,
    pub bottom_crop: f32,
    pub image_size: u32,
}

impl Record for ImageHeader {
    const SIZE: usize = 36;
    const NAME: &'static str = "image header";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            id: buf.get_u32_le(),
            format: ImageFormat::from(buf.get_u32_le()),
            width: buf.get_u32_le(),
            height: buf.get_u32_le(),
            left_crop: buf.get_f32_le(),
            top_crop: buf.get_f32_le(),
            right_crop: buf.get_f32_le(),
            bottom_crop: buf.get_f32_le(),
            image_size: buf.get_u32_le(),
        }
    }
}

// Skeleton

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub id: u32,
    pub position: Vec3,
    pub rotation: Quaternion,
}

impl Record for Segment {
    const SIZE: usize = 32;
    const NAME: &'static str = "skeleton segment";

    fn parse(buf: &mut &[u8]) -> Self {
        let id = buf.get_u32_le();
        let position = Vec3::parse(buf);
        let [x, y, z, w] = floats::<4>(buf);
        Self {
            id,
            position,
            rotation: Quaternion { x, y, z, w },
        }
    }
}

// Timecode

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timecode {
    pub kind: u32,
    pub hi: u32,
    pub lo: u32,
}

impl Record for Timecode {
    const SIZE: usize = 12;
    const NAME: &'static str = "timecode";

    fn parse(buf: &mut &[u8]) -> Self {
        Self {
            kind: buf.get_u32_le(),
            hi: buf.get_u32_le(),
            lo: buf.get_u32_le(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_reports_truncation_without_advancing() {
        let data = [1u8, 0, 0, 0, 2, 0, 0];
        let mut reader = RecordReader::new(&data, 0);

        let count: ComponentCount = reader.read().unwrap();
        assert_eq!(count.count, 1);
        assert_eq!(reader.offset(), 4);

        let err = reader.read::<ComponentCount>().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                record: "component count",
                offset: 4,
                needed: 4,
                available: 3,
            }
        );
        assert_eq!(reader.offset(), 4);
    }

    #[test]
    fn read_many_checks_the_whole_run_up_front() {
        let data = [0u8; 20];
        let mut reader = RecordReader::new(&data, 0);
        assert!(reader.read_many::<Vec3>(2).is_err());
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.read_many::<Vec3>(1).unwrap().len(), 1);
    }

    #[test]
    fn huge_counts_do_not_allocate() {
        let data = [0u8; 8];
        let mut reader = RecordReader::new(&data, 0);
        assert!(reader.read_many::<Segment>(u32::MAX).is_err());
        assert!(reader.skip::<Marker2d>(u32::MAX).is_err());
    }

    #[test]
    fn float_block_size_follows_its_length() {
        let mut data = Vec::new();
        for v in [1.0f32, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let block = FloatBlock::new(3);
        assert_eq!(block.size(), 12);

        let mut reader = RecordReader::new(&data, 0);
        assert_eq!(block.read(&mut reader).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(reader.offset(), 12);
    }

    #[test]
    fn record_sizes_match_wire_layout() {
        assert_eq!(DataPrefix::SIZE, 8 + 4 + 4);
        assert_eq!(Camera2d::SIZE, 4 + 1);
        assert_eq!(Marker2d::SIZE, 4 + 4 + 2 + 2);
        assert_eq!(Marker3dNoLabelResidual::SIZE, 3 * 4 + 4 + 4);
        assert_eq!(RotationMatrix::SIZE, 9 * 4);
        assert_eq!(Force::SIZE, 9 * 4);
        assert_eq!(ImageHeader::SIZE, 4 * 4 + 4 * 4 + 4);
        assert_eq!(Segment::SIZE, 4 + 3 * 4 + 4 * 4);
        assert_eq!(Timecode::SIZE, 3 * 4);
    }

    #[test]
    fn segment_parses_id_position_and_quaternion() {
        let mut data = 7u32.to_le_bytes().to_vec();
        for v in [1.0f32, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let mut reader = RecordReader::new(&data, 0);
        let segment: Segment = reader.read().unwrap();
        assert_eq!(segment.id, 7);
        assert_eq!(segment.position, Vec3 { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(segment.rotation.w, 1.0);
    }
}
