use std::cell::RefCell;
use std::rc::Rc;

use crate::timing::{GpuTimer, GpuTimers, NativeBridge, TimerId};

use super::host::{self, Plugin};
use super::stream::RenderEventFn;

/// Coordinator type used by the runtime.
pub type FrameTimers = GpuTimers<PluginBridge>;

/// Timer handle type used by the runtime.
pub type FrameTimer = GpuTimer<PluginBridge>;

/// [`NativeBridge`] implementation backed by the in-process [`Plugin`].
///
/// Events are the plugin's callbacks; issuing one appends it to the plugin's
/// command stream.
#[derive(Clone)]
pub struct PluginBridge {
    plugin: Rc<RefCell<Plugin>>,
}

impl PluginBridge {
    pub fn new(plugin: Rc<RefCell<Plugin>>) -> Self {
        Self { plugin }
    }
}

impl NativeBridge for PluginBridge {
    type Event = RenderEventFn;

    fn begin_frame_event(&self) -> RenderEventFn {
        host::on_begin_frame
    }

    fn end_frame_event(&self) -> RenderEventFn {
        host::on_end_frame
    }

    fn begin_timer_event(&self) -> RenderEventFn {
        host::on_begin_timer
    }

    fn end_timer_event(&self) -> RenderEventFn {
        host::on_end_timer
    }

    fn issue_plugin_event(&mut self, event: RenderEventFn, param: i32) {
        self.plugin
            .borrow_mut()
            .stream_mut()
            .issue_plugin_event(event, param);
    }

    fn create_timer(&mut self) -> TimerId {
        self.plugin.borrow_mut().create_timer()
    }

    fn release_timers(&mut self) {
        self.plugin.borrow_mut().release_timers();
    }

    fn timer_duration(&self, id: TimerId) -> f32 {
        self.plugin.borrow().timer_duration(id)
    }

    fn frame_timer_duration(&self) -> f32 {
        self.plugin.borrow().frame_timer_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{test_support, StreamItem, TimingConfig};

    fn setup() -> (FrameTimers, Rc<RefCell<Plugin>>) {
        let plugin = Rc::new(RefCell::new(Plugin::new(TimingConfig::default())));
        (GpuTimers::new(PluginBridge::new(plugin.clone())), plugin)
    }

    fn stream_events(plugin: &Rc<RefCell<Plugin>>) -> Vec<(RenderEventFn, i32)> {
        plugin
            .borrow()
            .stream()
            .items()
            .iter()
            .filter_map(|i| match i {
                StreamItem::Event { func, param } => Some((*func, *param)),
                StreamItem::Commands(_) => None,
            })
            .collect()
    }

    #[test]
    fn tick_queues_frame_markers_in_order() {
        let (timers, plugin) = setup();
        timers.initialize();
        timers.tick();

        let events = stream_events(&plugin);
        assert_eq!(events.len(), 2);
        assert!(std::ptr::fn_addr_eq(events[0].0, host::on_end_frame as RenderEventFn));
        assert!(std::ptr::fn_addr_eq(events[1].0, host::on_begin_frame as RenderEventFn));
        assert_eq!((events[0].1, events[1].1), (0, 0));
    }

    #[test]
    fn timers_stay_unassigned_without_device() {
        let (timers, plugin) = setup();
        let t = timers.create_named_gpu_timer("compute");
        timers.tick();
        assert!(!t.is_assigned());

        t.begin();
        t.end();
        assert_eq!(stream_events(&plugin).len(), 2);
        assert_eq!(t.duration(), host::NO_DEVICE_DURATION);
    }

    #[test]
    fn ticks_after_teardown_queue_nothing() {
        let (timers, plugin) = setup();
        timers.initialize();
        timers.tick();
        timers.teardown();
        timers.tick();
        assert_eq!(stream_events(&plugin).len(), 2);
    }

    #[test]
    fn measurements_reach_handles_through_the_device() {
        let Some((device, queue)) = test_support::timestamp_device() else {
            return;
        };
        let plugin = Rc::new(RefCell::new(Plugin::new(TimingConfig { max_timers: 2 })));
        plugin.borrow_mut().on_device_event(host::DeviceEvent::Initialize {
            device: device.clone(),
            queue,
        });
        let timers = GpuTimers::new(PluginBridge::new(plugin.clone()));

        let a = timers.create_named_gpu_timer("a");
        let b = timers.create_named_gpu_timer("b");
        let c = timers.create_named_gpu_timer("c");
        timers.tick();
        plugin.borrow_mut().flush();
        assert_eq!(
            (a.id(), b.id(), c.id()),
            (TimerId(0), TimerId(1), TimerId::UNASSIGNED)
        );

        let landed = test_support::settle(|| {
            a.begin();
            plugin
                .borrow_mut()
                .stream_mut()
                .push_commands(test_support::encoder(&device).finish());
            a.end();
            timers.tick();
            plugin.borrow_mut().flush();
            a.duration() >= 0.0 && timers.frame_duration() >= 0.0
        });

        assert!(landed, "timestamps never came back");
        assert_eq!(b.duration(), crate::timing::NO_DURATION);
        assert_eq!(c.duration(), crate::timing::NO_DURATION);
    }
}
