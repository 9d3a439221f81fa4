//! Configure and execute phases of the standard behaviors

use tracing::{debug, trace};

use super::Engine;
use super::handlers::DeviceHandlers;
use crate::behavior::{
    Behavior, BehaviorId, BehaviorKind, LevelChange, SECONDS_PER_DAY, catch_up, keys,
    next_start_time, time_of_day, value_crosses_boundary,
};
use crate::device::{Property, Transducer, Value, find_property, find_property_mut};
use crate::protocol::{
    CommandKind, EntryType, Error, PerceptType, Properties, Result, SETUP_TRANSDUCER, Timestamp,
    attribute,
};

/// Behavior lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    /// Compute the first firing from the current properties
    Configure,
    /// Perform the effect and reschedule
    Execute,
}

/// Next firing and informational period.
type Firing = (Timestamp, i64);

fn shown<'p>(properties: &'p [Property], key: &str) -> Option<&'p Value> {
    find_property(properties, key)
        .filter(|property| property.show())
        .map(Property::value)
}

impl<H: DeviceHandlers> Engine<H> {
    /// Include `kind` for `target` and run its configure phase, excluding it
    /// again when that fails.
    pub(super) fn configure(
        &mut self,
        kind: BehaviorKind,
        target: Option<usize>,
        property_key: Option<&str>,
    ) -> Result<bool> {
        if property_key.is_some_and(|key| !kind.matches_property_key(key)) {
            return Ok(false);
        }
        let id = match self.behaviors.include(kind, target) {
            Ok(id) => id,
            Err(err) => {
                self.log(&err);
                return Err(err);
            }
        };
        let now = self.clock.now();
        if self.run_behavior(id, Phase::Configure, now) {
            debug!(%kind, ?target, "behavior configured");
            Ok(true)
        } else {
            trace!(%kind, ?target, "behavior not configured");
            self.behaviors.exclude(id)?;
            Ok(false)
        }
    }

    /// Run one phase of the behavior in slot `id`; `false` means it should
    /// be excluded.
    pub(super) fn run_behavior(&mut self, id: BehaviorId, phase: Phase, now: Timestamp) -> bool {
        let Some(behavior) = self.behaviors.get(id).copied() else {
            return false;
        };
        let firing = match behavior.kind() {
            BehaviorKind::ReportAllAbsolute | BehaviorKind::ReportPointAbsolute => {
                self.report_absolute(&behavior, phase, now)
            }
            BehaviorKind::ReportAllInterval | BehaviorKind::ReportPointInterval => {
                self.report_interval(&behavior, phase, now)
            }
            BehaviorKind::DigitalTransition => self.digital_transition(&behavior, phase, now),
            BehaviorKind::OutOfBounds => self.out_of_bounds(&behavior, phase, now),
            BehaviorKind::SetupDevice => return self.setup_device(phase),
            BehaviorKind::TimerOffAbsolute
            | BehaviorKind::TimerOnAbsolute
            | BehaviorKind::TimerOffInterval
            | BehaviorKind::TimerOnInterval => self.timer(&behavior, phase, now),
        };
        let Some((next_firing, period)) = firing else {
            return false;
        };
        if let Some(slot) = self.behaviors.get_mut(id) {
            slot.next_firing = next_firing;
            slot.firing_period = period;
        }
        trace!(kind = %behavior.kind(), ?phase, next_firing, "behavior scheduled");
        true
    }

    fn settings(&self, behavior: &Behavior) -> Option<&[Property]> {
        if behavior.kind().is_device_wide() {
            return Some(self.device.properties());
        }
        behavior
            .transducer()
            .and_then(|index| self.device.transducers().get(index))
            .map(Transducer::properties)
    }

    fn settings_mut(&mut self, behavior: &Behavior) -> Option<&mut [Property]> {
        if behavior.kind().is_device_wide() {
            return Some(self.device.properties_mut());
        }
        let index = behavior.transducer()?;
        self.device
            .transducers_mut()
            .get_mut(index)
            .map(Transducer::properties_mut)
    }

    fn address_of(&self, behavior: &Behavior) -> Option<String> {
        behavior
            .transducer()
            .and_then(|index| self.device.transducers().get(index))
            .map(|transducer| transducer.address().to_owned())
    }

    fn report_absolute(
        &mut self,
        behavior: &Behavior,
        phase: Phase,
        now: Timestamp,
    ) -> Option<Firing> {
        let (run, time) = if behavior.kind() == BehaviorKind::ReportAllAbsolute {
            (keys::REPORT_ALL_ABSOLUTE_RUN, keys::REPORT_ALL_ABSOLUTE_TIME)
        } else {
            (keys::REPORT_POINT_ABSOLUTE_RUN, keys::REPORT_POINT_ABSOLUTE_TIME)
        };
        let properties = self.settings(behavior)?;
        let enabled = shown(properties, run)?.is_truthy();
        let time = shown(properties, time)?.as_int();
        if !enabled {
            return None;
        }
        let Some(time) = time_of_day(time) else {
            debug!(kind = %behavior.kind(), time, "report time outside the day");
            return None;
        };
        if phase == Phase::Execute {
            let address = self.address_of(behavior);
            self.report(None, address.as_deref(), EntryType::Scheduled, Some(now));
        }
        Some((next_start_time(now, time, true), SECONDS_PER_DAY))
    }

    fn report_interval(
        &mut self,
        behavior: &Behavior,
        phase: Phase,
        now: Timestamp,
    ) -> Option<Firing> {
        let (run, start, interval) = if behavior.kind() == BehaviorKind::ReportAllInterval {
            (
                keys::REPORT_ALL_INTERVAL_RUN,
                keys::REPORT_ALL_INTERVAL_START,
                keys::REPORT_ALL_INTERVAL_TIME,
            )
        } else {
            (
                keys::REPORT_POINT_INTERVAL_RUN,
                keys::REPORT_POINT_INTERVAL_START,
                keys::REPORT_POINT_INTERVAL_TIME,
            )
        };
        let minimum = self.config.min_report_interval;
        let properties = self.settings_mut(behavior)?;
        let enabled = shown(properties, run)?.is_truthy();
        let start = shown(properties, start)?.as_int();
        let interval = find_property_mut(properties, interval).filter(|property| property.show())?;
        if !enabled {
            return None;
        }
        let Some(start) = time_of_day(start) else {
            debug!(kind = %behavior.kind(), start, "report start outside the day");
            return None;
        };
        let mut period = interval.value().as_int();
        if period < minimum {
            debug!(key = interval.key(), period, minimum, "report interval raised");
            period = minimum;
            interval.value_mut().set(&period.to_string());
        }

        match phase {
            Phase::Configure => Some((next_start_time(now, start, false), period)),
            Phase::Execute => {
                let address = self.address_of(behavior);
                self.report(None, address.as_deref(), EntryType::Scheduled, Some(now));
                Some((catch_up(behavior.next_firing, period, now), period))
            }
        }
    }

    fn timer(&mut self, behavior: &Behavior, phase: Phase, now: Timestamp) -> Option<Firing> {
        let kind = behavior.kind();
        let sense = kind.timer_sense()?;
        let (run, time, absolute) = match kind {
            BehaviorKind::TimerOffAbsolute => {
                (keys::TIMER_LOW_ABSOLUTE_RUN, keys::TIMER_LOW_ABSOLUTE_TIME, true)
            }
            BehaviorKind::TimerOnAbsolute => {
                (keys::TIMER_HIGH_ABSOLUTE_RUN, keys::TIMER_HIGH_ABSOLUTE_TIME, true)
            }
            BehaviorKind::TimerOffInterval => {
                (keys::TIMER_LOW_INTERVAL_RUN, keys::TIMER_LOW_INTERVAL_TIME, false)
            }
            _ => (keys::TIMER_HIGH_INTERVAL_RUN, keys::TIMER_HIGH_INTERVAL_TIME, false),
        };
        let transducer = self.device.transducers().get(behavior.transducer()?)?;
        if transducer.percept_type() != PerceptType::Digital
            || !self.handlers.handles(CommandKind::TurnOn)
        {
            return None;
        }
        let enabled = shown(transducer.properties(), run)?.is_truthy();
        let value = shown(transducer.properties(), time)?.as_int();
        if !enabled {
            return None;
        }
        if absolute && time_of_day(value).is_none() {
            debug!(%kind, value, "timer time outside the day");
            return None;
        }

        if phase == Phase::Execute {
            let address = transducer.address().to_owned();
            self.turn(None, Some(&address), sense, &Properties::empty());
        }
        match (absolute, phase) {
            (true, _) => Some((next_start_time(now, value, true), SECONDS_PER_DAY)),
            (false, Phase::Configure) => Some((now.saturating_add(value), value)),
            (false, Phase::Execute) if value <= 0 => None,
            (false, Phase::Execute) => Some((catch_up(behavior.next_firing, value, now), value)),
        }
    }

    fn digital_transition(
        &mut self,
        behavior: &Behavior,
        phase: Phase,
        now: Timestamp,
    ) -> Option<Firing> {
        let index = behavior.transducer()?;
        let transducer = self.device.transducers().get(index)?;
        if transducer.percept_type() != PerceptType::Digital
            || !self.handlers.handles(CommandKind::RequestPercept)
        {
            return None;
        }
        let level = shown(transducer.properties(), keys::ALARM_LEVEL)?.as_int();
        let level = LevelChange::from_value(level).filter(|level| *level != LevelChange::Off)?;

        if phase == Phase::Execute {
            let mut timestamp = Some(now);
            let transducer = &mut self.device.transducers_mut()[index];
            if self.handlers.request_percept(transducer, &mut timestamp).is_success() {
                let last = transducer.last_value().as_int();
                let current = transducer.current_value().as_int();
                if last != current {
                    transducer.latch_current_value();
                }
                if level.triggers(last, current) {
                    let address = transducer.address().to_owned();
                    debug!(%address, ?level, "digital transition");
                    self.send_single_percept(
                        None,
                        Some(&address),
                        false,
                        EntryType::ByException,
                        timestamp,
                    );
                }
            }
        }
        Some((now, 0))
    }

    fn out_of_bounds(
        &mut self,
        behavior: &Behavior,
        phase: Phase,
        now: Timestamp,
    ) -> Option<Firing> {
        let index = behavior.transducer()?;
        let transducer = self.device.transducers().get(index)?;
        if transducer.percept_type() != PerceptType::Analog
            || !self.handlers.handles(CommandKind::RequestPercept)
        {
            return None;
        }
        let bound = |key| shown(transducer.properties(), key).map(Value::as_float);
        let (low, high) = (bound(keys::LOW), bound(keys::HIGH));
        let (low_low, high_high) = (bound(keys::LOW_LOW), bound(keys::HIGH_HIGH));
        if [low, high, low_low, high_high].iter().all(Option::is_none) {
            return None;
        }

        if phase == Phase::Execute {
            let mut timestamp = Some(now);
            let transducer = &mut self.device.transducers_mut()[index];
            if self.handlers.request_percept(transducer, &mut timestamp).is_success() {
                let last = transducer.last_value().as_float();
                let current = transducer.current_value().as_float();
                if value_crosses_boundary(last, current, low, high)
                    || value_crosses_boundary(last, current, low_low, high_high)
                {
                    transducer.latch_current_value();
                    let address = transducer.address().to_owned();
                    debug!(%address, last, current, "boundary crossed");
                    self.send_single_percept(
                        None,
                        Some(&address),
                        false,
                        EntryType::ByException,
                        timestamp,
                    );
                }
            }
        }
        Some((now, 0))
    }

    /// Announce every transducer in one message. Always finishes the
    /// behavior once executed.
    fn setup_device(&mut self, phase: Phase) -> bool {
        if phase == Phase::Configure {
            return true;
        }
        if !self.prepare_message(None) {
            return false;
        }
        for index in 0..self.device.transducers().len() {
            if let Err(err) = self.announce_transducer(index) {
                self.outgoing = None;
                self.log(&err);
                return false;
            }
        }
        self.send_message();
        false
    }

    fn announce_transducer(&mut self, index: usize) -> Result<()> {
        let transducer = &self.device.transducers()[index];
        let arena = &mut self.property_arena;
        arena.reset();
        let exhausted = |_| Error::PropertyBufferExhausted;
        let mut set = arena
            .alloc_property_set(transducer.properties().len() + 3)
            .map_err(exhausted)?;

        let percept_type = transducer.percept_type().property_name(
            transducer.direction().is_output(),
            !self.config.announce_default_type,
        );
        let header = [
            (attribute::TYPE, percept_type),
            (attribute::LABEL, transducer.label()),
            (attribute::UNITS, transducer.units()),
        ];
        let configured = transducer
            .properties()
            .iter()
            .filter(|property| property.show())
            .map(|property| (property.key(), Some(property.value().as_str())));
        for (key, value) in header.into_iter().chain(configured) {
            set.push(arena, Some(key), value).map_err(exhausted)?;
        }

        let pairs: Vec<(&str, &str)> = set.iter(arena).collect();
        trace!(address = transducer.address(), properties = pairs.len(), "announce transducer");
        let message = self.outgoing.as_mut().ok_or(Error::MessageUnavailable)?;
        message.create_command(
            None,
            Some(transducer.address()),
            SETUP_TRANSDUCER,
            &pairs,
            true,
            None,
        )
    }
}
