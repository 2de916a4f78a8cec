use crate::object::MonitoredObject;
use oxwatch_common::types::ObjectKey;
use oxwatch_downtime::{DowntimeTarget, DowntimeTargets};
use std::collections::BTreeMap;

/// Owner of every monitored object, keyed by [`ObjectKey`].
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<ObjectKey, MonitoredObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object. Returns `false` and keeps the existing object if the
    /// key is already taken.
    pub fn insert(&mut self, object: impl Into<MonitoredObject>) -> bool {
        let object = object.into();
        if self.objects.contains_key(object.key()) {
            return false;
        }
        self.objects.insert(object.key().clone(), object);
        true
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&MonitoredObject> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: &ObjectKey) -> Option<&mut MonitoredObject> {
        self.objects.get_mut(key)
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonitoredObject> {
        self.objects.values()
    }

    /// Services attached to `host`, in name order.
    pub fn services_of<'a>(&'a self, host: &'a str) -> impl Iterator<Item = &'a MonitoredObject> {
        self.objects
            .values()
            .filter(move |o| !o.key().is_host() && o.key().host_name() == host)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl DowntimeTargets for ObjectRegistry {
    fn target_mut(&mut self, key: &ObjectKey) -> Option<&mut dyn DowntimeTarget> {
        self.objects
            .get_mut(key)
            .map(MonitoredObject::as_downtime_target_mut)
    }
}
