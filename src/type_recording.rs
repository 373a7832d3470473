//! Call-site type feedback.
//!
//! Instrumented code passes every value produced at a call site through [TypeRecorder::record].
//! The recorder only remembers the class it saw last and how many times in a row it saw it. Once a
//! streak is long enough the compiler may ask for a prediction and speculate on it. A wrong
//! prediction costs a deoptimization in the consumer, never correctness, so nothing here has to be
//! exact.

use hashbrown::HashMap;
use std::sync::atomic::AtomicBool;

use crate::globals::PREDICTION_THRESHOLD;

/// Stable identity of a program location.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SiteId(pub usize);

/// Identity of an object class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ClassId(pub u32);

/// Values whose class can be recorded.
pub trait Classify {
    fn class_id(&self) -> ClassId;
}

impl Classify for ClassId {
    fn class_id(&self) -> ClassId {
        *self
    }
}

impl<T: Classify + ?Sized> Classify for &T {
    fn class_id(&self) -> ClassId {
        (**self).class_id()
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TypeRecorder {
    last_seen: Option<ClassId>,
    last_count: u64,
}

impl TypeRecorder {
    /// Records the class of `obj` and hands `obj` back unchanged.
    #[inline]
    pub fn record<T: Classify>(&mut self, obj: T) -> T {
        let class = obj.class_id();
        if self.last_seen != Some(class) {
            self.last_seen = Some(class);
            self.last_count = 1;
        } else {
            self.last_count += 1;
        }
        obj
    }

    pub fn last_seen(&self) -> Option<ClassId> {
        self.last_seen
    }

    pub fn last_count(&self) -> u64 {
        self.last_count
    }

    fn streak_prediction(&self) -> Option<ClassId> {
        if self.last_count > PREDICTION_THRESHOLD {
            self.last_seen
        } else {
            None
        }
    }
}

/// Per-site recorders. Grows monotonically, recorders are never evicted.
pub struct TypeFeedback {
    enabled: AtomicBool,
    recorders: HashMap<SiteId, TypeRecorder>,
}

impl TypeFeedback {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            recorders: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(atomic::Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, atomic::Ordering::Relaxed);
    }

    /// Recorder for `site`, created on first use.
    pub fn recorder_for_site(&mut self, site: SiteId) -> &mut TypeRecorder {
        self.recorders.entry(site).or_default()
    }

    pub fn record_type<T: Classify>(&mut self, site: SiteId, obj: T) -> T {
        self.recorder_for_site(site).record(obj)
    }

    /// Class the compiler may speculate on at `site`, if feedback is enabled and the site has a
    /// long enough streak.
    pub fn predict_class_for(&self, site: SiteId) -> Option<ClassId> {
        if !self.is_enabled() {
            return None;
        }
        self.recorders.get(&site)?.streak_prediction()
    }

    pub fn get(&self, site: SiteId) -> Option<&TypeRecorder> {
        self.recorders.get(&site)
    }

    pub fn sites(&self) -> usize {
        self.recorders.len()
    }
}

impl Default for TypeFeedback {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INT: ClassId = ClassId(1);
    const STR: ClassId = ClassId(2);
    const SITE: SiteId = SiteId(0x4000);

    struct Boxed {
        class: ClassId,
        value: i64,
    }

    impl Classify for Boxed {
        fn class_id(&self) -> ClassId {
            self.class
        }
    }

    #[test]
    fn long_streak_is_predicted() {
        let mut feedback = TypeFeedback::new(true);
        for _ in 0..101 {
            feedback.record_type(SITE, INT);
        }
        assert_eq!(feedback.predict_class_for(SITE), Some(INT));
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut feedback = TypeFeedback::new(true);
        for _ in 0..100 {
            feedback.record_type(SITE, INT);
        }
        assert_eq!(feedback.predict_class_for(SITE), None);
        feedback.record_type(SITE, INT);
        assert_eq!(feedback.predict_class_for(SITE), Some(INT));
    }

    #[test]
    fn different_class_resets_streak() {
        let mut feedback = TypeFeedback::new(true);
        for _ in 0..50 {
            feedback.record_type(SITE, INT);
        }
        feedback.record_type(SITE, STR);
        let recorder = feedback.get(SITE).unwrap();
        assert_eq!(recorder.last_seen(), Some(STR));
        assert_eq!(recorder.last_count(), 1);
        assert_eq!(feedback.predict_class_for(SITE), None);
    }

    #[test]
    fn disabled_feedback_never_predicts() {
        let mut feedback = TypeFeedback::new(false);
        for _ in 0..1000 {
            feedback.record_type(SITE, INT);
        }
        assert_eq!(feedback.predict_class_for(SITE), None);
        feedback.set_enabled(true);
        assert_eq!(feedback.predict_class_for(SITE), Some(INT));
    }

    #[test]
    fn unknown_site_predicts_nothing() {
        let feedback = TypeFeedback::new(true);
        assert_eq!(feedback.predict_class_for(SiteId(7)), None);
        assert_eq!(feedback.sites(), 0);
    }

    #[test]
    fn record_is_transparent() {
        let mut feedback = TypeFeedback::new(true);
        let value = feedback.record_type(SITE, Boxed { class: INT, value: 7 });
        assert_eq!(value.value, 7);
        let borrowed = feedback.recorder_for_site(SITE).record(&value);
        assert_eq!(borrowed.value, 7);
        assert_eq!(feedback.get(SITE).unwrap().last_count(), 2);
    }

    #[test]
    fn sites_are_independent() {
        let mut feedback = TypeFeedback::new(true);
        for _ in 0..200 {
            feedback.record_type(SiteId(1), INT);
            feedback.record_type(SiteId(2), STR);
        }
        assert_eq!(feedback.predict_class_for(SiteId(1)), Some(INT));
        assert_eq!(feedback.predict_class_for(SiteId(2)), Some(STR));
        assert_eq!(feedback.sites(), 2);
    }
}
