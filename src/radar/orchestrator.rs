// ═══════════════════════════════════════════════════════════════════════════════
// 📦 radar/orchestrator.rs - Detection Cycle
// ═══════════════════════════════════════════════════════════════════════════════
// منسق الدورة: تحديث الخانات ثم تشغيل مرشح كل خانة ثم تجميع النتيجة
// Cycle orchestrator: reconcile slots, run each slot's filter, aggregate
//
// One cycle:
//   1. empty list → Inoperable, nothing touched
//   2. reconcile (evict zero / absent / weak)
//   3. incomplete → rank by RSSI, fill vacancies
//   4. ingest RSSI into every Valid correlated slot
//   5. sum variances, flag alarms
// ═══════════════════════════════════════════════════════════════════════════════

use super::{
    rank_by_strength, Bssid, ChannelConfig, EvictionReason, Observation, RadarStatus, SlotChange,
    SlotRegistry, SlotState, MAX_SCAN_RESULTS,
};
use crate::config::RadarConfig;
use crate::error::RadarError;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Cycle Events / أحداث الدورة
// ═══════════════════════════════════════════════════════════════════════════════

/// Structured notification emitted while a cycle runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    CycleStarted {
        cycle: u64,
        observations: usize,
    },
    Inoperable {
        cycle: u64,
    },
    SlotEvicted {
        slot: usize,
        bssid: Bssid,
        reason: EvictionReason,
    },
    SlotAdmitted {
        slot: usize,
        bssid: Bssid,
        rssi: i32,
    },
    SlotProcessed {
        slot: usize,
        bssid: Bssid,
        rssi: i32,
        status: RadarStatus,
    },
    CycleFinished {
        cycle: u64,
        status: RadarStatus,
        total_variance: i64,
    },
}

/// Receiver of cycle events, injected per call
pub trait CycleObserver {
    fn on_event(&mut self, event: &CycleEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CycleObserver for NoopObserver {
    fn on_event(&mut self, _event: &CycleEvent) {}
}

/// Forwards events to `tracing`
/// يرسل الأحداث إلى نظام السجلات
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CycleObserver for TracingObserver {
    fn on_event(&mut self, event: &CycleEvent) {
        match event {
            CycleEvent::CycleStarted {
                cycle,
                observations,
            } => tracing::trace!(cycle, observations, "cycle started"),
            CycleEvent::Inoperable { cycle } => {
                tracing::warn!(cycle, "no observations, radar inoperable")
            }
            CycleEvent::SlotEvicted {
                slot,
                bssid,
                reason,
            } => tracing::info!(slot, %bssid, %reason, "slot evicted"),
            CycleEvent::SlotAdmitted { slot, bssid, rssi } => {
                tracing::info!(slot, %bssid, rssi, "slot admitted")
            }
            CycleEvent::SlotProcessed {
                slot,
                bssid,
                rssi,
                status,
            } => tracing::debug!(slot, %bssid, rssi, %status, "slot processed"),
            CycleEvent::CycleFinished {
                cycle,
                status,
                total_variance,
            } => {
                if status.is_detection() {
                    tracing::info!(cycle, total_variance, "motion detected");
                } else {
                    tracing::debug!(cycle, %status, total_variance, "cycle finished");
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Cycle Result / نتيجة الدورة
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-slot outcome of one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SlotReport {
    pub index: usize,
    pub state: SlotState,
    pub bssid: Bssid,
    pub ssid: String,
    /// Raw RSSI fed this cycle
    pub rssi: Option<i32>,
    /// `None` when the slot was not processed
    pub status: Option<RadarStatus>,
    /// Variance that crossed the threshold
    pub alarm: Option<i64>,
}

impl SlotReport {
    /// Variance value for charts and logs
    pub fn variance(&self) -> Option<i64> {
        self.status.and_then(|status| status.value())
    }
}

/// Everything one cycle produced
#[derive(Debug, Clone, PartialEq)]
pub struct CycleResult {
    pub cycle: u64,
    pub status: RadarStatus,
    pub slots: Vec<SlotReport>,
    /// Sum of every slot's non-negative value
    pub total_variance: i64,
    pub changes: Vec<SlotChange>,
}

impl CycleResult {
    pub fn any_alarm(&self) -> bool {
        self.slots.iter().any(|slot| slot.alarm.is_some())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Radar Context / سياق الرادار
// ═══════════════════════════════════════════════════════════════════════════════

/// Explicit radar context; independent instances do not share state
#[derive(Debug, Clone, Default)]
pub struct Radar {
    registry: SlotRegistry,
    cycle: u64,
}

impl Radar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a radar from validated settings
    pub fn from_config(config: &RadarConfig) -> Result<Self, RadarError> {
        let mut registry = SlotRegistry::new(config.slot_count);
        registry.set_aggressive_cleaning(config.aggressive_cleaning);
        registry.configure_channels(config.channel)?;
        Ok(Self { registry, cycle: 0 })
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Cycles run so far
    pub fn cycle_count(&self) -> u64 {
        self.cycle
    }

    /// Resize the registry; transmitters in dropped slots come back as
    /// `Released` evictions.
    pub fn set_slot_count(&mut self, count: usize) -> Vec<SlotChange> {
        self.registry.set_slot_count(count)
    }

    pub fn set_aggressive_cleaning(&mut self, enabled: bool) {
        self.registry.set_aggressive_cleaning(enabled);
    }

    pub fn configure_channels(&mut self, config: ChannelConfig) -> Result<(), RadarError> {
        self.registry.configure_channels(config)
    }

    pub fn channel_config(&self) -> ChannelConfig {
        self.registry.channel_config()
    }

    /// Forget every transmitter, keeping the configuration
    pub fn reset(&mut self) {
        self.registry.clear();
        self.cycle = 0;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 🔄 Cycle / الدورة
    // ═══════════════════════════════════════════════════════════════════════

    /// Run one cycle, logging events through `tracing`
    pub fn run_cycle(&mut self, observations: &[Observation]) -> CycleResult {
        self.run_cycle_with(observations, &mut TracingObserver)
    }

    /// Run one cycle and report events to `observer`
    pub fn run_cycle_with(
        &mut self,
        observations: &[Observation],
        observer: &mut dyn CycleObserver,
    ) -> CycleResult {
        self.cycle += 1;
        let cycle = self.cycle;

        let observations = if observations.len() > MAX_SCAN_RESULTS {
            tracing::warn!(
                received = observations.len(),
                kept = MAX_SCAN_RESULTS,
                "scan list truncated"
            );
            &observations[..MAX_SCAN_RESULTS]
        } else {
            observations
        };

        observer.on_event(&CycleEvent::CycleStarted {
            cycle,
            observations: observations.len(),
        });

        if observations.is_empty() {
            observer.on_event(&CycleEvent::Inoperable { cycle });
            let result = CycleResult {
                cycle,
                status: RadarStatus::Inoperable,
                slots: self.idle_reports(),
                total_variance: 0,
                changes: Vec::new(),
            };
            observer.on_event(&CycleEvent::CycleFinished {
                cycle,
                status: result.status,
                total_variance: 0,
            });
            return result;
        }

        // reconcile
        let mut changes = self.registry.reconcile(observations);
        for change in &changes {
            if let SlotChange::Evicted {
                slot,
                bssid,
                reason,
            } = change
            {
                observer.on_event(&CycleEvent::SlotEvicted {
                    slot: *slot,
                    bssid: *bssid,
                    reason: *reason,
                });
            }
        }

        // fill vacancies strongest-first
        if !self.registry.is_complete() {
            for index in rank_by_strength(observations) {
                let observation = &observations[index];
                if self.registry.find_by_identity(&observation.bssid).is_some() {
                    // already correlated by reconcile
                    continue;
                }
                let Some(vacant) = self.registry.first_vacant() else {
                    break;
                };
                if self.registry.admit(observation, vacant, index) {
                    observer.on_event(&CycleEvent::SlotAdmitted {
                        slot: vacant,
                        bssid: observation.bssid,
                        rssi: observation.rssi,
                    });
                    changes.push(SlotChange::Admitted {
                        slot: vacant,
                        bssid: observation.bssid,
                    });
                }
            }
        }

        // process
        let mut reports = Vec::with_capacity(self.registry.slot_count());
        for index in 0..self.registry.slot_count() {
            let Some(slot) = self.registry.slot_mut(index) else {
                continue;
            };

            let correlated = match (slot.state(), slot.observation_index()) {
                (SlotState::Valid, Some(found)) => observations.get(found),
                _ => None,
            };

            let report = match correlated {
                Some(observation) => {
                    let status = slot.channel_mut().ingest(observation.rssi);
                    observer.on_event(&CycleEvent::SlotProcessed {
                        slot: index,
                        bssid: slot.identity(),
                        rssi: observation.rssi,
                        status,
                    });
                    SlotReport {
                        index,
                        state: slot.state(),
                        bssid: slot.identity(),
                        ssid: slot.display_name().to_string(),
                        rssi: Some(observation.rssi),
                        status: Some(status),
                        alarm: match status {
                            RadarStatus::Detection(v) => Some(v),
                            _ => None,
                        },
                    }
                }
                None => idle_report(index, slot),
            };
            reports.push(report);
        }

        let (status, total_variance) = aggregate(&reports);
        observer.on_event(&CycleEvent::CycleFinished {
            cycle,
            status,
            total_variance,
        });

        CycleResult {
            cycle,
            status,
            slots: reports,
            total_variance,
            changes,
        }
    }

    fn idle_reports(&self) -> Vec<SlotReport> {
        self.registry
            .slots()
            .iter()
            .enumerate()
            .map(|(index, slot)| idle_report(index, slot))
            .collect()
    }
}

fn idle_report(index: usize, slot: &super::Slot) -> SlotReport {
    SlotReport {
        index,
        state: slot.state(),
        bssid: slot.identity(),
        ssid: slot.display_name().to_string(),
        rssi: None,
        status: None,
        alarm: None,
    }
}

/// Cycle status and cumulative variance from the slot reports
fn aggregate(reports: &[SlotReport]) -> (RadarStatus, i64) {
    let total = reports
        .iter()
        .filter_map(|report| match report.status {
            Some(RadarStatus::Detection(v)) | Some(RadarStatus::Level(v)) => Some(v.max(0)),
            _ => None,
        })
        .fold(0i64, i64::saturating_add);

    let any = |check: fn(&RadarStatus) -> bool| {
        reports
            .iter()
            .filter_map(|report| report.status.as_ref())
            .any(check)
    };

    let status = if reports.iter().any(|report| report.alarm.is_some()) {
        RadarStatus::Detection(total)
    } else if any(|s| matches!(s, RadarStatus::NoDetection)) {
        RadarStatus::NoDetection
    } else if any(|s| matches!(s, RadarStatus::Level(_))) {
        RadarStatus::Level(total)
    } else {
        RadarStatus::Booting
    };

    (status, total)
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radar::{SAMPLE_BUFFER_SIZE, DEFAULT_SLOT_COUNT};
    use proptest::prelude::*;

    fn ap(last: u8, rssi: i32) -> Observation {
        Observation::new(Bssid([0xde, 0xad, 0, 0, 0, last]), rssi, 11, "office")
    }

    #[derive(Default)]
    struct Recorder(Vec<CycleEvent>);

    impl CycleObserver for Recorder {
        fn on_event(&mut self, event: &CycleEvent) {
            self.0.push(event.clone());
        }
    }

    #[test]
    fn test_empty_list_is_inoperable_and_untouched() {
        let mut radar = Radar::new();
        radar.run_cycle(&[ap(1, -50)]);

        let result = radar.run_cycle(&[]);

        assert_eq!(result.status, RadarStatus::Inoperable);
        assert!(result.changes.is_empty());
        assert_eq!(radar.registry().valid_count(), 1);
        assert_eq!(radar.registry().slot(0).unwrap().channel().sample_index(), 1);
    }

    #[test]
    fn test_strongest_fill_vacancies_first() {
        let mut radar = Radar::from_config(&RadarConfig {
            slot_count: 2,
            ..RadarConfig::default()
        })
        .unwrap();

        let result = radar.run_cycle(&[ap(1, -80), ap(2, -40), ap(3, -60)]);

        let reg = radar.registry();
        assert_eq!(reg.slot(0).unwrap().identity(), ap(2, 0).bssid);
        assert_eq!(reg.slot(1).unwrap().identity(), ap(3, 0).bssid);
        assert!(reg.is_complete());
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.status, RadarStatus::Booting);
    }

    #[test]
    fn test_detection_after_stable_period() {
        let mut radar = Radar::new();
        for _ in 0..SAMPLE_BUFFER_SIZE {
            let result = radar.run_cycle(&[ap(1, -50)]);
            assert!(!result.any_alarm());
        }

        let result = radar.run_cycle(&[ap(1, -30)]);

        assert_eq!(result.status, RadarStatus::Detection(361));
        assert_eq!(result.total_variance, 361);
        assert_eq!(result.slots[0].alarm, Some(361));
        assert_eq!(result.slots.len(), DEFAULT_SLOT_COUNT);
    }

    #[test]
    fn test_stable_signal_reports_no_detection() {
        let mut radar = Radar::new();
        let mut last = None;
        for _ in 0..SAMPLE_BUFFER_SIZE + 5 {
            last = Some(radar.run_cycle(&[ap(1, -50), ap(2, -62)]));
        }
        let result = last.unwrap();
        assert_eq!(result.status, RadarStatus::NoDetection);
        assert_eq!(result.total_variance, 0);
    }

    #[test]
    fn test_alarm_disabled_reports_level() {
        let mut radar = Radar::new();
        radar
            .configure_channels(ChannelConfig {
                alarm_enabled: false,
                ..ChannelConfig::default()
            })
            .unwrap();
        for _ in 0..SAMPLE_BUFFER_SIZE {
            radar.run_cycle(&[ap(1, -50)]);
        }
        let result = radar.run_cycle(&[ap(1, -30)]);
        assert_eq!(result.status, RadarStatus::Level(361));
        assert!(!result.any_alarm());
    }

    #[test]
    fn test_absent_transmitter_evicted_and_replaced() {
        let mut radar = Radar::from_config(&RadarConfig {
            slot_count: 1,
            ..RadarConfig::default()
        })
        .unwrap();
        radar.run_cycle(&[ap(1, -50)]);

        let result = radar.run_cycle(&[ap(2, -55)]);

        assert_eq!(
            result.changes,
            vec![
                SlotChange::Evicted {
                    slot: 0,
                    bssid: ap(1, 0).bssid,
                    reason: EvictionReason::Absent
                },
                SlotChange::Admitted {
                    slot: 0,
                    bssid: ap(2, 0).bssid
                },
            ]
        );
        // buffers reinitialised on admission
        assert_eq!(radar.registry().slot(0).unwrap().channel().sample_index(), 1);
    }

    #[test]
    fn test_zero_bssid_never_admitted() {
        let mut radar = Radar::new();
        radar.run_cycle(&[Observation::new(Bssid::ZERO, -20, 1, "ghost"), ap(1, -70)]);
        assert_eq!(radar.registry().valid_count(), 1);
        assert_eq!(radar.registry().slot(0).unwrap().identity(), ap(1, 0).bssid);
    }

    #[test]
    fn test_scan_list_is_clamped() {
        let observations: Vec<Observation> = (0..80u8).map(|i| ap(i, -40 - i32::from(i))).collect();
        let mut radar = Radar::from_config(&RadarConfig {
            slot_count: 8,
            ..RadarConfig::default()
        })
        .unwrap();
        let mut recorder = Recorder::default();

        radar.run_cycle_with(&observations, &mut recorder);

        assert_eq!(
            recorder.0[0],
            CycleEvent::CycleStarted {
                cycle: 1,
                observations: MAX_SCAN_RESULTS
            }
        );
    }

    #[test]
    fn test_observer_event_sequence() {
        let mut radar = Radar::new();
        let mut recorder = Recorder::default();

        radar.run_cycle_with(&[ap(1, -50)], &mut recorder);
        radar.run_cycle_with(&[], &mut recorder);

        let bssid = ap(1, 0).bssid;
        assert_eq!(
            recorder.0,
            vec![
                CycleEvent::CycleStarted { cycle: 1, observations: 1 },
                CycleEvent::SlotAdmitted { slot: 0, bssid, rssi: -50 },
                CycleEvent::SlotProcessed {
                    slot: 0,
                    bssid,
                    rssi: -50,
                    status: RadarStatus::Booting
                },
                CycleEvent::CycleFinished {
                    cycle: 1,
                    status: RadarStatus::Booting,
                    total_variance: 0
                },
                CycleEvent::CycleStarted { cycle: 2, observations: 0 },
                CycleEvent::Inoperable { cycle: 2 },
                CycleEvent::CycleFinished {
                    cycle: 2,
                    status: RadarStatus::Inoperable,
                    total_variance: 0
                },
            ]
        );
    }

    #[test]
    fn test_instances_are_independent() {
        let mut a = Radar::new();
        let b = Radar::new();
        a.run_cycle(&[ap(1, -50)]);
        assert_eq!(a.cycle_count(), 1);
        assert_eq!(b.cycle_count(), 0);
        assert_eq!(b.registry().valid_count(), 0);
    }

    #[test]
    fn test_reset_keeps_configuration() {
        let mut radar = Radar::new();
        radar.set_slot_count(2);
        radar
            .configure_channels(ChannelConfig {
                variance_threshold: 50,
                ..ChannelConfig::default()
            })
            .unwrap();
        radar.run_cycle(&[ap(1, -50)]);

        radar.reset();

        assert_eq!(radar.cycle_count(), 0);
        assert_eq!(radar.registry().valid_count(), 0);
        assert_eq!(radar.registry().slot_count(), 2);
        assert_eq!(radar.channel_config().variance_threshold, 50);
    }

    proptest! {
        #[test]
        fn prop_valid_identities_stay_unique(
            cycles in prop::collection::vec(
                prop::collection::vec((0u8..6, -100i32..-20), 0..10),
                1..30,
            ),
            slot_count in 1usize..=8,
            aggressive in any::<bool>(),
        ) {
            let mut radar = Radar::new();
            radar.set_slot_count(slot_count);
            radar.set_aggressive_cleaning(aggressive);

            for scan in cycles {
                let observations: Vec<Observation> =
                    scan.iter().map(|&(id, rssi)| ap(id, rssi)).collect();
                let result = radar.run_cycle_with(&observations, &mut NoopObserver);

                if observations.is_empty() {
                    prop_assert_eq!(result.status, RadarStatus::Inoperable);
                }

                let valid: Vec<Bssid> = radar
                    .registry()
                    .slots()
                    .iter()
                    .filter(|s| s.state() == SlotState::Valid)
                    .map(|s| s.identity())
                    .collect();
                for (i, id) in valid.iter().enumerate() {
                    prop_assert!(!id.is_zero());
                    prop_assert!(!valid[i + 1..].contains(id));
                }
                prop_assert!(result.total_variance >= 0);
            }
        }
    }
}
