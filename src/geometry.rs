//! Normalized facial geometry
//!
//! This module derives scale-invariant measurements from a landmark frame:
//! - Mouth opening normalized by face height
//!
//! Dividing by face height keeps the measurement independent of how far the
//! subject sits from the camera and of the frame resolution.

use crate::types::{
    LandmarkFrame, MouthOpeningSample, FACE_BOTTOM, FACE_TOP, LOWER_LIP, UPPER_LIP,
};

/// Geometry deriver for landmark frames
pub struct NormalizedGeometry;

impl NormalizedGeometry {
    /// Compute the mouth opening ratio, or `None` when the frame is unusable
    pub fn mouth_opening(frame: &LandmarkFrame) -> Option<MouthOpeningSample> {
        let upper = frame.point(UPPER_LIP)?;
        let lower = frame.point(LOWER_LIP)?;
        let top = frame.point(FACE_TOP)?;
        let bottom = frame.point(FACE_BOTTOM)?;

        let mouth_gap = (lower.y - upper.y).abs();
        let face_height = (bottom.y - top.y).abs();

        compute_ratio(mouth_gap, face_height).map(|ratio| MouthOpeningSample { ratio })
    }
}

fn compute_ratio(gap: f64, height: f64) -> Option<f64> {
    if !gap.is_finite() || !height.is_finite() || height <= 0.0 {
        return None;
    }
    Some(gap / height)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::LandmarkPoint;

    /// Build a frame with the four required landmarks at the given heights
    pub(crate) fn face_frame(upper_lip: f64, lower_lip: f64, top: f64, bottom: f64) -> LandmarkFrame {
        let mut points = vec![LandmarkPoint::default(); FACE_BOTTOM + 1];
        points[UPPER_LIP] = LandmarkPoint::new(0.5, upper_lip, 0.0);
        points[LOWER_LIP] = LandmarkPoint::new(0.5, lower_lip, 0.0);
        points[FACE_TOP] = LandmarkPoint::new(0.5, top, 0.0);
        points[FACE_BOTTOM] = LandmarkPoint::new(0.5, bottom, 0.0);
        LandmarkFrame::new(points)
    }

    /// Frame whose opening ratio is `ratio` (up to float rounding) over a face of height 0.5
    ///
    /// Not exact enough for threshold-equality checks; use a `MouthOpeningSample` there.
    pub(crate) fn frame_with_ratio(ratio: f64) -> LandmarkFrame {
        face_frame(0.6, 0.6 + ratio * 0.5, 0.3, 0.8)
    }

    #[test]
    fn test_mouth_opening_ratio() {
        let frame = face_frame(0.60, 0.66, 0.30, 0.80);
        let sample = NormalizedGeometry::mouth_opening(&frame).unwrap();

        // 0.06 / 0.5, within float rounding of 0.12
        assert!((sample.ratio - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_is_scale_invariant() {
        // Same face twice as far from the camera: every distance halves
        let near = face_frame(0.60, 0.70, 0.20, 0.90);
        let far = face_frame(0.30, 0.35, 0.10, 0.45);

        let near_ratio = NormalizedGeometry::mouth_opening(&near).unwrap().ratio;
        let far_ratio = NormalizedGeometry::mouth_opening(&far).unwrap().ratio;
        assert!((near_ratio - far_ratio).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_coordinates_use_absolute_distances() {
        let frame = face_frame(0.66, 0.60, 0.80, 0.30);
        let sample = NormalizedGeometry::mouth_opening(&frame).unwrap();
        assert!((sample.ratio - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_missing_landmark_is_unavailable() {
        // Only 100 points: the chin (152) is absent
        let frame = LandmarkFrame::new(vec![LandmarkPoint::default(); 100]);
        assert!(NormalizedGeometry::mouth_opening(&frame).is_none());
        assert!(NormalizedGeometry::mouth_opening(&LandmarkFrame::default()).is_none());
    }

    #[test]
    fn test_degenerate_face_height_is_unavailable() {
        let frame = face_frame(0.6, 0.7, 0.5, 0.5);
        assert!(NormalizedGeometry::mouth_opening(&frame).is_none());

        let frame = face_frame(0.6, f64::NAN, 0.3, 0.8);
        assert!(NormalizedGeometry::mouth_opening(&frame).is_none());
    }
}
