//! Signal and game pipeline through the public API only.
//!
//! Needs no crate features, so it also runs under `--no-default-features`.

use std::sync::Arc;

use therapy_flux::media::{DeviceSlot, MediaKind, MediaSource, MediaStream};
use therapy_flux::metrics::MemorySink;
use therapy_flux::types::{
    LandmarkFrame, LandmarkPoint, FACE_BOTTOM, FACE_TOP, LOWER_LIP, UPPER_LIP,
};
use therapy_flux::{
    ExerciseType, ManualClock, OralMotorSession, SessionDeps, TherapyConfig, TherapyError,
};

struct Camera;

struct CameraStream;

impl MediaStream for CameraStream {
    fn close(&mut self) {}
}

impl MediaSource for Camera {
    fn open(&self, _kind: MediaKind) -> Result<Box<dyn MediaStream>, TherapyError> {
        Ok(Box::new(CameraStream))
    }
}

fn open_mouth(gap: f64) -> LandmarkFrame {
    let mut points = vec![LandmarkPoint::default(); FACE_BOTTOM + 1];
    points[FACE_TOP] = LandmarkPoint::new(0.5, 0.2, 0.0);
    points[FACE_BOTTOM] = LandmarkPoint::new(0.5, 0.7, 0.0);
    points[UPPER_LIP] = LandmarkPoint::new(0.5, 0.5, 0.0);
    points[LOWER_LIP] = LandmarkPoint::new(0.5, 0.5 + gap, 0.0);
    LandmarkFrame::new(points)
}

#[test]
fn oral_motor_session_without_http_stack() {
    let clock = ManualClock::new(0);
    let sink = MemorySink::new();
    let deps = SessionDeps {
        source: Arc::new(Camera),
        slot: DeviceSlot::new(MediaKind::Camera),
        sink: Arc::new(sink.clone()),
        clock: Arc::new(clock.clone()),
    };

    let mut session = OralMotorSession::with_entropy(&TherapyConfig::default(), "kid-1", deps);
    session.start().unwrap();

    let mut counts = Vec::new();
    for t in [0, 1000, 2000] {
        clock.set(t);
        // 0.15 / 0.5 face height = 0.3, well over the threshold
        if let Some(event) = session.process_frame(&open_mouth(0.15)).event {
            counts.push(event.treats_collected);
        }
    }
    assert_eq!(counts, vec![1, 2, 3]);

    let record = session.stop().unwrap();
    assert_eq!(record.exercise_type, ExerciseType::OralMotor);
    assert_eq!(record.accuracy_percent, Some(30.0));
    assert_eq!(sink.records().len(), 1);
}
