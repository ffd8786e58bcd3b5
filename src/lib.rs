//! Mavic Mini RC <-> virtual joystick bridge
//!
//! Polls a DJI Mavic Mini remote controller over its serial link with a
//! fixed ping frame, decodes the five analog axes from the response, and
//! feeds them to a virtual joystick device, with a keyboard hotkey mapped
//! to a debounced toggle button.

pub mod bridge;
pub mod debounce;
pub mod joystick;
pub mod mapper;
pub mod protocol;
pub mod transport;
pub mod trigger;

pub use bridge::{Bridge, BridgeError};
pub use debounce::{ToggleDebouncer, DEBOUNCE_INTERVAL};
pub use joystick::{JoystickError, Sink, VirtualJoystick, AXIS_CENTER, AXIS_MAX, AXIS_MIN};
pub use mapper::{scale, AxisMapper, InvertSet, UnknownAxis};
pub use protocol::{decode, Axis, FrameError, RawAxes, PING, RESPONSE_LEN};
pub use transport::{SerialTransport, Transport, TransportError};
pub use trigger::{KeyTrigger, NoTrigger, TriggerError, TriggerSource};
