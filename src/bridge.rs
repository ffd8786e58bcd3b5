//! The poll loop driving the ping/response cycle
//!
//! One logical thread of control alternates between a non-blocking
//! trigger check, a blocking ping write, and a deadline-bounded frame
//! read. Cancellation is a shared flag observed at every blocking point;
//! the wait for hotkey release sleeps in short slices for the same
//! reason.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::debounce::ToggleDebouncer;
use crate::joystick::{JoystickError, Sink};
use crate::mapper::AxisMapper;
use crate::protocol::{self, Axis, FrameError};
use crate::transport::{Transport, TransportError};
use crate::trigger::TriggerSource;

/// Fatal poll-loop errors. Wrong-length frames are absorbed inside the
/// loop and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Sink(#[from] JoystickError),
}

/// How often the release-wait re-samples the trigger
const RELEASE_POLL: Duration = Duration::from_millis(5);

/// Owns one bridging session: transport, sink, trigger, and toggle state
pub struct Bridge<T, S, K> {
    transport: T,
    sink: S,
    trigger: K,
    mapper: AxisMapper,
    debouncer: ToggleDebouncer,
    stop: Arc<AtomicBool>,
}

impl<T: Transport, S: Sink, K: TriggerSource> Bridge<T, S, K> {
    pub fn new(
        transport: T,
        sink: S,
        trigger: K,
        mapper: AxisMapper,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            sink,
            trigger,
            mapper,
            debouncer: ToggleDebouncer::new(),
            stop,
        }
    }

    /// Run the ping/response cycle until the stop flag is raised or a
    /// transport/sink operation fails
    pub fn run(&mut self) -> Result<(), BridgeError> {
        while !self.stopped() {
            self.check_trigger()?;
            if self.stopped() {
                break;
            }

            self.transport.write_ping(&protocol::PING)?;

            match self.transport.read_frame()? {
                // Deadline expired: skip this cycle, re-check the stop flag
                None => continue,
                Some(frame) => self.dispatch(&frame)?,
            }
        }
        Ok(())
    }

    /// Recover the adapters for cleanup after the loop exits
    pub fn into_parts(self) -> (T, S, K) {
        (self.transport, self.sink, self.trigger)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Non-blocking trigger check; on a press, toggle (debounced), publish
    /// the button immediately, then block until release
    fn check_trigger(&mut self) -> Result<(), BridgeError> {
        if !self.trigger.is_asserted() {
            return Ok(());
        }

        let state = self.debouncer.trigger(Instant::now());
        debug!("button 1 toggled {}", if state { "on" } else { "off" });
        self.sink.set_button(state);
        self.sink.commit()?;

        // Holding the key must not re-trigger once the debounce window
        // reopens, so the whole loop waits for release.
        while self.trigger.is_asserted() && !self.stopped() {
            std::thread::sleep(RELEASE_POLL);
        }
        Ok(())
    }

    /// Decode, scale, and publish one received frame
    fn dispatch(&mut self, frame: &[u8]) -> Result<(), BridgeError> {
        let raw = match protocol::decode(frame) {
            Ok(raw) => raw,
            // Partial read or line noise: skip the cycle silently
            Err(FrameError::UnexpectedLength { len }) => {
                trace!("discarded frame of {len} bytes");
                return Ok(());
            }
        };

        let values = self.mapper.map(&raw);
        for (axis, value) in values {
            self.sink.set_axis(axis, value);
        }
        self.sink.set_button(self.debouncer.state());
        self.sink.commit()?;

        let get = |axis: Axis| values.iter().find(|(a, _)| *a == axis).unwrap().1;
        debug!(
            "L: H{:06} V{:06}; R: H{:06} V{:06}; CAM: {:06}; BTN: {}",
            get(Axis::LeftHorizontal),
            get(Axis::LeftVertical),
            get(Axis::RightHorizontal),
            get(Axis::RightVertical),
            get(Axis::Camera),
            if self.debouncer.state() { "ON" } else { "OFF" },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::InvertSet;
    use crate::protocol::RESPONSE_LEN;
    use crate::trigger::NoTrigger;
    use std::collections::VecDeque;

    /// Serves scripted frames; raises the stop flag when it runs dry
    struct ScriptedTransport {
        frames: VecDeque<Option<Vec<u8>>>,
        pings: usize,
        stop: Arc<AtomicBool>,
    }

    impl Transport for ScriptedTransport {
        fn write_ping(&mut self, ping: &[u8]) -> Result<(), TransportError> {
            assert_eq!(ping, protocol::PING);
            self.pings += 1;
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
            match self.frames.pop_front() {
                Some(frame) => Ok(frame),
                None => {
                    self.stop.store(true, Ordering::Relaxed);
                    Ok(None)
                }
            }
        }

        fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    /// Records every committed output batch
    #[derive(Default)]
    struct RecordingSink {
        axes: Vec<(Axis, i32)>,
        button: bool,
        dirty: bool,
        commits: Vec<(Vec<(Axis, i32)>, bool)>,
    }

    impl Sink for RecordingSink {
        fn set_axis(&mut self, axis: Axis, value: i32) {
            self.axes.retain(|(a, _)| *a != axis);
            self.axes.push((axis, value));
            self.dirty = true;
        }

        fn set_button(&mut self, pressed: bool) {
            self.button = pressed;
            self.dirty = true;
        }

        fn commit(&mut self) -> Result<(), JoystickError> {
            if self.dirty {
                self.commits.push((self.axes.clone(), self.button));
                self.dirty = false;
            }
            Ok(())
        }

        fn reset(&mut self) -> Result<(), JoystickError> {
            self.axes.clear();
            self.button = false;
            self.commits.push((Vec::new(), false));
            Ok(())
        }
    }

    fn frame_with(rh: u16, rv: u16, lv: u16, lh: u16, cam: u16) -> Vec<u8> {
        let mut frame = vec![0u8; RESPONSE_LEN];
        frame[7..9].copy_from_slice(&rh.to_le_bytes());
        frame[10..12].copy_from_slice(&rv.to_le_bytes());
        frame[13..15].copy_from_slice(&lv.to_le_bytes());
        frame[16..18].copy_from_slice(&lh.to_le_bytes());
        frame[19..21].copy_from_slice(&cam.to_le_bytes());
        frame[37] = 0x0a;
        frame
    }

    fn run_bridge(frames: Vec<Option<Vec<u8>>>) -> (usize, Vec<(Vec<(Axis, i32)>, bool)>) {
        let stop = Arc::new(AtomicBool::new(false));
        let transport = ScriptedTransport {
            frames: frames.into(),
            pings: 0,
            stop: stop.clone(),
        };
        let mapper = AxisMapper::new(InvertSet::default());
        let mut bridge = Bridge::new(transport, RecordingSink::default(), NoTrigger, mapper, stop);
        bridge.run().unwrap();
        let (transport, sink, _) = bridge.into_parts();
        (transport.pings, sink.commits)
    }

    #[test]
    fn test_good_frame_produces_expected_output() {
        let (pings, commits) = run_bridge(vec![Some(frame_with(1024, 364, 1684, 700, 1100))]);

        // One ping for the frame, one more that drains the script
        assert_eq!(pings, 2);
        assert_eq!(commits.len(), 1);

        let (axes, button) = &commits[0];
        let get = |axis: Axis| axes.iter().find(|(a, _)| *a == axis).unwrap().1;
        assert_eq!(get(Axis::RightHorizontal), 16384);
        assert_eq!(get(Axis::RightVertical), 32768); // inverted by default
        assert_eq!(get(Axis::LeftVertical), 0); // inverted by default
        assert_eq!(get(Axis::LeftHorizontal), 8341);
        assert_eq!(get(Axis::Camera), 18270);
        assert!(!button);
    }

    #[test]
    fn test_wrong_length_frames_skip_output() {
        let (pings, commits) = run_bridge(vec![
            Some(vec![0u8; 37]),
            Some(vec![0u8; 39]),
            Some(Vec::new()),
        ]);
        assert_eq!(pings, 4);
        assert!(commits.is_empty());
    }

    #[test]
    fn test_wrong_length_frame_leaves_previous_output_standing() {
        let (_, commits) = run_bridge(vec![
            Some(frame_with(1024, 1024, 1024, 1024, 1024)),
            Some(vec![0u8; 39]),
        ]);
        // The bad frame adds no commit
        assert_eq!(commits.len(), 1);
    }

    #[test]
    fn test_read_timeout_skips_cycle_and_repings() {
        let (pings, commits) = run_bridge(vec![None, Some(frame_with(1024, 1024, 1024, 1024, 1024))]);
        assert_eq!(pings, 3);
        assert_eq!(commits.len(), 1);
    }

    #[test]
    fn test_transport_write_error_is_fatal() {
        struct FailingTransport;
        impl Transport for FailingTransport {
            fn write_ping(&mut self, _: &[u8]) -> Result<(), TransportError> {
                Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "gone",
                )))
            }
            fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
                unreachable!()
            }
            fn close(&mut self) -> Result<(), TransportError> {
                Ok(())
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let mapper = AxisMapper::new(InvertSet::empty());
        let mut bridge = Bridge::new(
            FailingTransport,
            RecordingSink::default(),
            NoTrigger,
            mapper,
            stop,
        );
        assert!(matches!(bridge.run(), Err(BridgeError::Transport(_))));
    }

    #[test]
    fn test_trigger_press_toggles_and_publishes_button() {
        /// Asserted exactly once, then released
        struct OneShotTrigger {
            fired: bool,
        }
        impl TriggerSource for OneShotTrigger {
            fn is_asserted(&mut self) -> bool {
                !std::mem::replace(&mut self.fired, true)
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let transport = ScriptedTransport {
            frames: VecDeque::from(vec![Some(frame_with(1024, 1024, 1024, 1024, 1024))]),
            pings: 0,
            stop: stop.clone(),
        };
        let mapper = AxisMapper::new(InvertSet::empty());
        let mut bridge = Bridge::new(
            transport,
            RecordingSink::default(),
            OneShotTrigger { fired: false },
            mapper,
            stop,
        );
        bridge.run().unwrap();
        let (_, sink, _) = bridge.into_parts();

        // First commit: the immediate button publish. Second: the frame,
        // with the toggled state merged in.
        assert_eq!(sink.commits.len(), 2);
        assert!(sink.commits[0].0.is_empty());
        assert!(sink.commits[0].1);
        assert!(sink.commits[1].1);
    }
}
