//! Device event notifications.

use std::fmt;
use std::time::Duration;

use crate::handles::{RenderTargetHandle, ShaderHandle};

/// Something the device reports to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    ResizeCanvas { width: u32, height: u32 },
    DeviceLost,
    DeviceRestored,
    FboCreate { target: RenderTargetHandle, duration: Duration },
    ShaderCompileStart { shader: ShaderHandle },
    ShaderCompileEnd { shader: ShaderHandle, duration: Duration },
    ShaderLinkStart { shader: ShaderHandle },
    ShaderLinkEnd { shader: ShaderHandle, duration: Duration },
}

/// Discriminant of [`DeviceEvent`], used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ResizeCanvas,
    DeviceLost,
    DeviceRestored,
    FboCreate,
    ShaderCompileStart,
    ShaderCompileEnd,
    ShaderLinkStart,
    ShaderLinkEnd,
}

impl DeviceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DeviceEvent::ResizeCanvas { .. } => EventKind::ResizeCanvas,
            DeviceEvent::DeviceLost => EventKind::DeviceLost,
            DeviceEvent::DeviceRestored => EventKind::DeviceRestored,
            DeviceEvent::FboCreate { .. } => EventKind::FboCreate,
            DeviceEvent::ShaderCompileStart { .. } => EventKind::ShaderCompileStart,
            DeviceEvent::ShaderCompileEnd { .. } => EventKind::ShaderCompileEnd,
            DeviceEvent::ShaderLinkStart { .. } => EventKind::ShaderLinkStart,
            DeviceEvent::ShaderLinkEnd { .. } => EventKind::ShaderLinkEnd,
        }
    }
}

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut(&DeviceEvent)>;

/// Listener registry.
#[derive(Default)]
pub struct EventEmitter {
    next_id: u64,
    listeners: Vec<(ListenerId, EventKind, Callback)>,
}

impl EventEmitter {
    pub fn on(&mut self, kind: EventKind, callback: impl FnMut(&DeviceEvent) + 'static) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, kind, Box::new(callback)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _, _)| *listener != id);
        self.listeners.len() != before
    }

    pub fn fire(&mut self, event: DeviceEvent) {
        let kind = event.kind();
        for (_, listener_kind, callback) in &mut self.listeners {
            if *listener_kind == kind {
                callback(&event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_fire_matches_kind() {
        let mut emitter = EventEmitter::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        emitter.on(EventKind::ResizeCanvas, move |event| {
            sink.borrow_mut().push(event.clone())
        });

        emitter.fire(DeviceEvent::DeviceLost);
        emitter.fire(DeviceEvent::ResizeCanvas {
            width: 10,
            height: 20,
        });

        assert_eq!(
            *seen.borrow(),
            vec![DeviceEvent::ResizeCanvas {
                width: 10,
                height: 20
            }]
        );
    }

    #[test]
    fn test_off() {
        let mut emitter = EventEmitter::default();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let id = emitter.on(EventKind::DeviceLost, move |_| *sink.borrow_mut() += 1);

        emitter.fire(DeviceEvent::DeviceLost);
        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        emitter.fire(DeviceEvent::DeviceLost);

        assert_eq!(*count.borrow(), 1);
        assert!(emitter.is_empty());
    }
}
