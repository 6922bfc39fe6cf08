// ═══════════════════════════════════════════════════════════════════════════════
// 📦 radar/registry.rs - Transmitter Slot Registry
// ═══════════════════════════════════════════════════════════════════════════════
// سجل الخانات: يربط كل نقطة وصول متتبعة بمرشح قناة خاص بها
// Slot registry: pairs each tracked access point with its own channel filter
//
// Slot lifecycle:
//   Init ──admit──► Valid ──(zero id | absent | weak)──► Invalid ──admit──► Valid
//                     └────────── set_slot_count ──────► Free
// ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;

use super::{Bssid, ChannelConfig, ChannelFilter, Observation, DEFAULT_SLOT_COUNT, MAX_SLOTS};
use crate::error::RadarError;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Slot State / حالة الخانة
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Tracking a transmitter
    Valid,
    /// Released by a smaller slot count
    Free,
    /// Never used since start
    Init,
    /// Transmitter lost, waiting for reuse
    Invalid,
}

impl SlotState {
    /// Free, Init and Invalid slots can take a new transmitter
    pub fn is_vacant(&self) -> bool {
        !matches!(self, SlotState::Valid)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlotState::Valid => "VALID",
            SlotState::Free => "FREE",
            SlotState::Init => "INIT",
            SlotState::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a slot lost its transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Identity became all-zero while tracked
    InvalidIdentity,
    /// Transmitter missing from the current scan
    Absent,
    /// Signal below the minimum RSSI (aggressive cleaning)
    WeakSignal,
    /// Slot count reduced
    Released,
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EvictionReason::InvalidIdentity => "invalid identity",
            EvictionReason::Absent => "absent from scan",
            EvictionReason::WeakSignal => "weak signal",
            EvictionReason::Released => "slot released",
        };
        f.write_str(text)
    }
}

/// Registry mutation reported back to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    Admitted {
        slot: usize,
        bssid: Bssid,
    },
    Evicted {
        slot: usize,
        bssid: Bssid,
        reason: EvictionReason,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Slot / الخانة
// ═══════════════════════════════════════════════════════════════════════════════

/// One transmitter position in the registry
/// موقع جهاز إرسال واحد في السجل
#[derive(Debug, Clone)]
pub struct Slot {
    identity: Bssid,
    display_name: String,
    state: SlotState,
    channel: ChannelFilter,
    /// Index into this cycle's observation list
    observation_index: Option<usize>,
    latest_rssi: Option<i32>,
}

impl Slot {
    fn new() -> Self {
        Self {
            identity: Bssid::ZERO,
            display_name: String::new(),
            state: SlotState::Init,
            channel: ChannelFilter::new(),
            observation_index: None,
            latest_rssi: None,
        }
    }

    /// Drop the transmitter and schedule a buffer reset
    fn vacate(&mut self, state: SlotState) {
        self.state = state;
        self.identity = Bssid::ZERO;
        self.display_name.clear();
        self.observation_index = None;
        self.latest_rssi = None;
        self.channel.request_reset();
    }

    pub fn identity(&self) -> Bssid {
        self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn channel(&self) -> &ChannelFilter {
        &self.channel
    }

    pub(crate) fn channel_mut(&mut self) -> &mut ChannelFilter {
        &mut self.channel
    }

    pub fn observation_index(&self) -> Option<usize> {
        self.observation_index
    }

    pub fn latest_rssi(&self) -> Option<i32> {
        self.latest_rssi
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Slot Registry / سجل الخانات
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-capacity table of transmitter slots.
///
/// Only the first `slot_count` slots take part in a cycle. Identities of
/// `Valid` slots are pairwise distinct and never all-zero.
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    slots: [Slot; MAX_SLOTS],
    slot_count: usize,
    aggressive_cleaning: bool,
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_COUNT)
    }
}

impl SlotRegistry {
    /// Registry with `slot_count` active slots (clamped to `[1, MAX_SLOTS]`)
    pub fn new(slot_count: usize) -> Self {
        let mut registry = Self {
            slots: std::array::from_fn(|_| Slot::new()),
            slot_count: MAX_SLOTS,
            aggressive_cleaning: false,
        };
        registry.set_slot_count(slot_count);
        registry
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Active slots only
    pub fn slots(&self) -> &[Slot] {
        &self.slots[..self.slot_count]
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots().get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots[..self.slot_count].get_mut(index)
    }

    pub fn aggressive_cleaning(&self) -> bool {
        self.aggressive_cleaning
    }

    /// Evict weak transmitters during reconcile
    pub fn set_aggressive_cleaning(&mut self, enabled: bool) {
        self.aggressive_cleaning = enabled;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 🔍 Lookup / البحث
    // ═══════════════════════════════════════════════════════════════════════

    /// Slot currently tracking `identity`
    pub fn find_by_identity(&self, identity: &Bssid) -> Option<usize> {
        self.slots()
            .iter()
            .position(|slot| slot.state == SlotState::Valid && slot.identity == *identity)
    }

    /// First reusable slot in index order
    pub fn first_vacant(&self) -> Option<usize> {
        self.slots().iter().position(|slot| slot.state.is_vacant())
    }

    /// Every active slot is tracking a transmitter
    pub fn is_complete(&self) -> bool {
        self.first_vacant().is_none()
    }

    pub fn valid_count(&self) -> usize {
        self.slots()
            .iter()
            .filter(|slot| slot.state == SlotState::Valid)
            .count()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ✏️ Mutation / التعديل
    // ═══════════════════════════════════════════════════════════════════════

    /// Put a transmitter into `slot`, correlated with `observation_index`.
    ///
    /// Does nothing and returns `false` for an inactive slot, an all-zero
    /// identity, or an identity already tracked by a `Valid` slot.
    pub fn admit(
        &mut self,
        observation: &Observation,
        slot: usize,
        observation_index: usize,
    ) -> bool {
        if slot >= self.slot_count
            || observation.bssid.is_zero()
            || self.find_by_identity(&observation.bssid).is_some()
        {
            return false;
        }

        let target = &mut self.slots[slot];
        target.identity = observation.bssid;
        target.display_name.clone_from(&observation.ssid);
        target.state = SlotState::Valid;
        target.observation_index = Some(observation_index);
        target.latest_rssi = Some(observation.rssi);
        target.channel.request_reset();
        true
    }

    /// Bring the registry in line with this cycle's observations.
    ///
    /// Runs the invalid-identity sweep, the dead-transmitter sweep and, with
    /// aggressive cleaning, the weak-signal sweep. Surviving `Valid` slots
    /// are re-correlated to the current list.
    pub fn reconcile(&mut self, observations: &[Observation]) -> Vec<SlotChange> {
        let mut changes = Vec::new();
        let aggressive = self.aggressive_cleaning;

        for (index, slot) in self.slots[..self.slot_count].iter_mut().enumerate() {
            slot.observation_index = None;

            if slot.state == SlotState::Valid && slot.identity.is_zero() {
                slot.vacate(SlotState::Invalid);
                changes.push(SlotChange::Evicted {
                    slot: index,
                    bssid: Bssid::ZERO,
                    reason: EvictionReason::InvalidIdentity,
                });
                continue;
            }

            if slot.identity.is_zero() {
                continue;
            }

            let bssid = slot.identity;
            match observations.iter().position(|obs| obs.bssid == bssid) {
                None => {
                    let was_valid = slot.state == SlotState::Valid;
                    slot.vacate(SlotState::Invalid);
                    if was_valid {
                        changes.push(SlotChange::Evicted {
                            slot: index,
                            bssid,
                            reason: EvictionReason::Absent,
                        });
                    }
                }
                Some(found) if slot.state == SlotState::Valid => {
                    slot.observation_index = Some(found);
                    slot.latest_rssi = Some(observations[found].rssi);
                }
                Some(_) => {}
            }
        }

        if aggressive {
            for (index, slot) in self.slots[..self.slot_count].iter_mut().enumerate() {
                if slot.state != SlotState::Valid {
                    continue;
                }
                let minimum = slot.channel.config().minimum_rssi;
                if slot.latest_rssi.is_some_and(|rssi| rssi < minimum) {
                    let bssid = slot.identity;
                    slot.vacate(SlotState::Invalid);
                    changes.push(SlotChange::Evicted {
                        slot: index,
                        bssid,
                        reason: EvictionReason::WeakSignal,
                    });
                }
            }
        }

        changes
    }

    /// Change how many slots are active (clamped to `[1, MAX_SLOTS]`).
    ///
    /// Slots beyond the new count become `Free` and lose their transmitter;
    /// every transmitter dropped this way is reported as `Released`.
    pub fn set_slot_count(&mut self, count: usize) -> Vec<SlotChange> {
        let count = count.clamp(1, MAX_SLOTS);
        let mut changes = Vec::new();

        for (index, slot) in self.slots.iter_mut().enumerate().skip(count) {
            if slot.state == SlotState::Valid {
                tracing::info!(slot = index, bssid = %slot.identity, "slot released");
                changes.push(SlotChange::Evicted {
                    slot: index,
                    bssid: slot.identity,
                    reason: EvictionReason::Released,
                });
            }
            if slot.state != SlotState::Free {
                slot.vacate(SlotState::Free);
            }
        }

        self.slot_count = count;
        changes
    }

    /// Forget every transmitter and restart every channel.
    ///
    /// Active slots go back to `Init`, the rest stay `Free`; the slot count,
    /// cleaning flag and channel configuration are kept.
    pub fn clear(&mut self) {
        let active = self.slot_count;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let state = if index < active {
                SlotState::Init
            } else {
                SlotState::Free
            };
            slot.vacate(state);
            slot.channel.restart();
        }
    }

    /// Apply one channel configuration to every slot
    /// تطبيق إعدادات القناة على جميع الخانات
    pub fn configure_channels(&mut self, config: ChannelConfig) -> Result<(), RadarError> {
        let config = config.validated()?;
        for slot in self.slots.iter_mut() {
            slot.channel.configure(config)?;
        }
        Ok(())
    }

    /// Current channel configuration (all slots share it)
    pub fn channel_config(&self) -> ChannelConfig {
        *self.slots[0].channel.config()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ap(last: u8, rssi: i32) -> Observation {
        Observation::new(Bssid([0x10, 0x20, 0x30, 0x40, 0x50, last]), rssi, 6, "lab")
    }

    #[test]
    fn test_new_registry_starts_in_init() {
        let registry = SlotRegistry::default();
        assert_eq!(registry.slot_count(), DEFAULT_SLOT_COUNT);
        assert!(registry.slots().iter().all(|s| s.state() == SlotState::Init));
        assert_eq!(registry.first_vacant(), Some(0));
        assert!(!registry.is_complete());
    }

    #[test]
    fn test_admit_and_find() {
        let mut registry = SlotRegistry::new(2);
        let obs = ap(1, -50);

        assert!(registry.admit(&obs, 0, 3));
        assert_eq!(registry.find_by_identity(&obs.bssid), Some(0));

        let slot = registry.slot(0).unwrap();
        assert_eq!(slot.state(), SlotState::Valid);
        assert_eq!(slot.observation_index(), Some(3));
        assert_eq!(slot.display_name(), "lab");
        assert!(slot.channel().is_reset_pending());
    }

    #[test]
    fn test_admit_rejects_duplicate_zero_and_out_of_range() {
        let mut registry = SlotRegistry::new(2);
        let obs = ap(1, -50);

        assert!(registry.admit(&obs, 0, 0));
        assert!(!registry.admit(&obs, 1, 0));
        assert!(!registry.admit(&Observation::new(Bssid::ZERO, -40, 1, ""), 1, 0));
        assert!(!registry.admit(&ap(2, -50), 2, 0));
        assert_eq!(registry.slot(1).unwrap().state(), SlotState::Init);
    }

    #[test]
    fn test_complete_when_all_valid() {
        let mut registry = SlotRegistry::new(2);
        registry.admit(&ap(1, -50), 0, 0);
        assert!(!registry.is_complete());
        registry.admit(&ap(2, -50), 1, 1);
        assert!(registry.is_complete());
        assert_eq!(registry.first_vacant(), None);
    }

    #[test]
    fn test_reconcile_evicts_absent() {
        let mut registry = SlotRegistry::new(2);
        let a = ap(1, -50);
        let b = ap(2, -60);
        registry.admit(&a, 0, 0);
        registry.admit(&b, 1, 1);

        let changes = registry.reconcile(&[b.clone()]);

        assert_eq!(
            changes,
            vec![SlotChange::Evicted {
                slot: 0,
                bssid: a.bssid,
                reason: EvictionReason::Absent
            }]
        );
        let evicted = registry.slot(0).unwrap();
        assert_eq!(evicted.state(), SlotState::Invalid);
        assert!(evicted.identity().is_zero());
        assert!(evicted.channel().is_reset_pending());

        // survivor re-correlated to its new position
        assert_eq!(registry.slot(1).unwrap().observation_index(), Some(0));
        assert_eq!(registry.first_vacant(), Some(0));
    }

    #[test]
    fn test_reconcile_refreshes_latest_rssi() {
        let mut registry = SlotRegistry::new(1);
        registry.admit(&ap(1, -50), 0, 0);
        registry.reconcile(&[ap(9, -40), ap(1, -65)]);

        let slot = registry.slot(0).unwrap();
        assert_eq!(slot.observation_index(), Some(1));
        assert_eq!(slot.latest_rssi(), Some(-65));
    }

    #[test]
    fn test_weak_signal_sweep_only_when_aggressive() {
        let mut registry = SlotRegistry::new(1);
        registry.admit(&ap(1, -50), 0, 0);

        registry.reconcile(&[ap(1, -90)]);
        assert_eq!(registry.slot(0).unwrap().state(), SlotState::Valid);

        registry.set_aggressive_cleaning(true);
        let changes = registry.reconcile(&[ap(1, -90)]);
        assert!(matches!(
            changes.as_slice(),
            [SlotChange::Evicted { reason: EvictionReason::WeakSignal, .. }]
        ));
        assert_eq!(registry.slot(0).unwrap().state(), SlotState::Invalid);
        assert!(registry.slot(0).unwrap().identity().is_zero());
    }

    #[test]
    fn test_reconcile_with_empty_list_evicts_everything() {
        let mut registry = SlotRegistry::new(3);
        registry.admit(&ap(1, -50), 0, 0);
        registry.admit(&ap(2, -50), 2, 1);

        let changes = registry.reconcile(&[]);
        assert_eq!(changes.len(), 2);
        assert_eq!(registry.valid_count(), 0);
        // untouched Init slot stays Init
        assert_eq!(registry.slot(1).unwrap().state(), SlotState::Init);
    }

    #[test]
    fn test_set_slot_count_clamps_and_releases() {
        let mut registry = SlotRegistry::new(4);
        registry.admit(&ap(1, -50), 3, 0);

        let changes = registry.set_slot_count(2);
        assert_eq!(registry.slot_count(), 2);
        assert_eq!(registry.slots().len(), 2);
        assert_eq!(registry.find_by_identity(&ap(1, -50).bssid), None);
        assert_eq!(
            changes,
            vec![SlotChange::Evicted {
                slot: 3,
                bssid: ap(1, -50).bssid,
                reason: EvictionReason::Released,
            }]
        );

        registry.set_slot_count(0);
        assert_eq!(registry.slot_count(), 1);
        assert!(registry.set_slot_count(100).is_empty());
        assert_eq!(registry.slot_count(), MAX_SLOTS);
        assert_eq!(registry.slot(3).unwrap().state(), SlotState::Free);
        assert!(registry.slot(3).unwrap().state().is_vacant());
    }

    #[test]
    fn test_clear_keeps_configuration() {
        let mut registry = SlotRegistry::new(3);
        registry.set_aggressive_cleaning(true);
        registry
            .configure_channels(ChannelConfig {
                variance_threshold: 40,
                second_order_attenuation: 8,
                ..ChannelConfig::default()
            })
            .unwrap();
        registry.admit(&ap(1, -50), 0, 0);
        registry.slot_mut(0).unwrap().channel_mut().ingest(-50);

        registry.clear();

        assert_eq!(registry.slot_count(), 3);
        assert!(registry.aggressive_cleaning());
        assert_eq!(registry.valid_count(), 0);
        assert!(registry.slots().iter().all(|s| s.state() == SlotState::Init));
        assert_eq!(registry.slot(5).unwrap().state(), SlotState::Free);
        for slot in registry.slots() {
            assert_eq!(slot.channel().config().variance_threshold, 40);
            assert_eq!(slot.channel().config().second_order_attenuation, 8);
            assert_eq!(slot.channel().sample_index(), 0);
            assert!(!slot.channel().is_reset_pending());
        }
    }

    #[test]
    fn test_configure_channels_applies_to_all() {
        let mut registry = SlotRegistry::new(3);
        let config = ChannelConfig {
            variance_threshold: 40,
            ..ChannelConfig::default()
        };
        registry.configure_channels(config).unwrap();
        assert!(registry
            .slots()
            .iter()
            .all(|s| s.channel().config().variance_threshold == 40));

        let bad = ChannelConfig {
            second_order_attenuation: 0,
            ..ChannelConfig::default()
        };
        assert!(registry.configure_channels(bad).is_err());
        assert_eq!(registry.channel_config().variance_threshold, 40);
    }

    proptest! {
        #[test]
        fn prop_admit_keeps_identities_unique(
            attempts in prop::collection::vec((0u8..4, 0usize..6), 0..40)
        ) {
            let mut registry = SlotRegistry::new(4);
            for (id, slot) in attempts {
                registry.admit(&ap(id, -50), slot, 0);
            }
            let valid: Vec<Bssid> = registry
                .slots()
                .iter()
                .filter(|s| s.state() == SlotState::Valid)
                .map(|s| s.identity())
                .collect();
            for (i, a) in valid.iter().enumerate() {
                prop_assert!(!a.is_zero());
                prop_assert!(!valid[i + 1..].contains(a));
            }
        }
    }
}
