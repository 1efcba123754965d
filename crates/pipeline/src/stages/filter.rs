//! Event filters by device name and by value descriptor.

use event_types::{Addressable, Event};
use tracing::debug;

use crate::collab::StageInitCtx;
use crate::data::Payload;
use crate::error::StageError;
use crate::params::{keys, ParamKind, ParamSpec, ResolvedParams};
use crate::registry::StageFactory;
use crate::stage::{expect_event, Stage, StageContext};

pub const FILTER_BY_DEVICE_NAME: &str = "filter-by-device-name";
pub const FILTER_BY_VALUE_DESCRIPTOR: &str = "filter-by-value-descriptor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Pass whole events whose device is listed.
    DeviceName,
    /// Keep only readings whose name is listed.
    ValueDescriptor,
}

/// Drops events, or readings within events, that are not of interest.
///
/// An empty filter list passes everything through.
#[derive(Debug)]
pub struct Filter {
    mode: FilterMode,
    values: Vec<String>,
}

impl Filter {
    pub fn new(mode: FilterMode, values: Vec<String>) -> Self {
        Self { mode, values }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn apply(&self, mut event: Event) -> Option<Event> {
        if self.values.is_empty() {
            return Some(event);
        }
        match self.mode {
            FilterMode::DeviceName => self
                .values
                .iter()
                .any(|name| *name == event.device)
                .then_some(event),
            FilterMode::ValueDescriptor => {
                event
                    .readings
                    .retain(|reading| self.values.iter().any(|name| *name == reading.name));
                (!event.readings.is_empty()).then_some(event)
            }
        }
    }
}

impl Stage for Filter {
    fn id(&self) -> &str {
        match self.mode {
            FilterMode::DeviceName => FILTER_BY_DEVICE_NAME,
            FilterMode::ValueDescriptor => FILTER_BY_VALUE_DESCRIPTOR,
        }
    }

    fn process(
        &mut self,
        data: Payload,
        _ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let event = expect_event(self.id(), data)?;
        Ok(self.apply(event).map(Payload::Event))
    }
}

/// A factory for creating device-name filters.
#[derive(Default)]
pub struct FilterByDeviceNameFactory;

impl StageFactory for FilterByDeviceNameFactory {
    fn stage_type(&self) -> &'static str {
        FILTER_BY_DEVICE_NAME
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[ParamSpec::required(keys::DEVICE_NAMES, ParamKind::List)];
        PARAMS
    }

    fn create(
        &self,
        params: &ResolvedParams,
        _: Option<&Addressable>,
        _: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        let names = params.list(keys::DEVICE_NAMES)?.to_vec();
        debug!(devicenames = %names.join(","), "device name filter");
        Ok(Box::new(Filter::new(FilterMode::DeviceName, names)))
    }
}

/// A factory for creating value-descriptor filters.
#[derive(Default)]
pub struct FilterByValueDescriptorFactory;

impl StageFactory for FilterByValueDescriptorFactory {
    fn stage_type(&self) -> &'static str {
        FILTER_BY_VALUE_DESCRIPTOR
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] =
            &[ParamSpec::required(keys::VALUE_DESCRIPTORS, ParamKind::List)];
        PARAMS
    }

    fn create(
        &self,
        params: &ResolvedParams,
        _: Option<&Addressable>,
        _: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        let names = params.list(keys::VALUE_DESCRIPTORS)?.to_vec();
        debug!(valuedescriptors = %names.join(","), "value descriptor filter");
        Ok(Box::new(Filter::new(FilterMode::ValueDescriptor, names)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_types::Reading;

    fn event(device: &str, readings: &[&str]) -> Event {
        Event::new(
            device,
            readings
                .iter()
                .map(|name| Reading::new(device, *name, "1"))
                .collect(),
        )
    }

    #[test]
    fn test_device_filter() {
        let mut filter = Filter::new(
            FilterMode::DeviceName,
            vec!["thermostat1".to_string(), "thermostat2".to_string()],
        );
        let mut ctx = StageContext::new();

        let kept = filter
            .process(Payload::Event(event("thermostat2", &["temperature"])), &mut ctx)
            .unwrap();
        assert_eq!(kept.unwrap().as_event().unwrap().device, "thermostat2");

        let dropped = filter
            .process(Payload::Event(event("motor", &["rpm"])), &mut ctx)
            .unwrap();
        assert!(dropped.is_none());
    }

    #[test]
    fn test_empty_filter_passes_all() {
        let mut filter = Filter::new(FilterMode::DeviceName, vec![]);
        let out = filter
            .process(Payload::Event(event("anything", &[])), &mut StageContext::new())
            .unwrap();
        assert!(out.is_some());
    }

    #[test]
    fn test_value_descriptor_filter() {
        let mut filter = Filter::new(FilterMode::ValueDescriptor, vec!["humidity".to_string()]);
        let mut ctx = StageContext::new();

        let out = filter
            .process(
                Payload::Event(event("d1", &["temperature", "humidity", "pressure"])),
                &mut ctx,
            )
            .unwrap()
            .unwrap();
        let names: Vec<&str> = out.as_event().unwrap().reading_names().collect();
        assert_eq!(names, vec!["humidity"]);

        let none = filter
            .process(Payload::Event(event("d1", &["temperature"])), &mut ctx)
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_filter_rejects_non_event() {
        let mut filter = Filter::new(FilterMode::DeviceName, vec!["d1".to_string()]);
        let err = filter
            .process(Payload::Text("d1".to_string()), &mut StageContext::new())
            .unwrap_err();
        assert!(matches!(err, StageError::UnexpectedPayload { .. }));
    }
}
