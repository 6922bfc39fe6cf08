// ═══════════════════════════════════════════════════════════════════════════════
// 📦 radar/channel.rs - Per-Transmitter Channel Filter
// ═══════════════════════════════════════════════════════════════════════════════
// مرشح القناة: يحول عينات RSSI لجهاز إرسال واحد إلى قيمة تباين للكشف
// Channel filter: turns one transmitter's RSSI samples into a variance value
//
// Pipeline per sample:
//   threshold substitution → sample ring → moving average → (x - avg)²
//   → second-order floor removal → variance ring → integral (last M)
//   → autoregressive smoothing → decision
// ═══════════════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};

use super::{
    RadarStatus, ABSOLUTE_RSSI_LIMIT, MOVING_AVERAGE_WINDOW, SAMPLE_BUFFER_SIZE,
    VARIANCE_BUFFER_SIZE, VARIANCE_INTEGRATOR_LIMIT,
};
use crate::error::RadarError;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Channel Configuration / إعدادات القناة
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime settings of one channel filter
/// إعدادات مرشح القناة القابلة للتغيير أثناء التشغيل
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Samples weaker than this are substituted (dBm)
    pub minimum_rssi: i32,

    /// Variance at or above this raises a detection (dBm²)
    pub variance_threshold: i64,

    /// Apply the threshold at all
    pub alarm_enabled: bool,

    /// Report the smoothed variance instead of the raw integral
    pub autoregressive_enabled: bool,

    /// Subtract the attenuated mean of the variance history
    pub second_order_enabled: bool,

    /// Divider of the second-order floor, must be >= 2
    pub second_order_attenuation: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            minimum_rssi: -80,
            variance_threshold: 16,
            alarm_enabled: true,
            autoregressive_enabled: false,
            second_order_enabled: true,
            second_order_attenuation: 16,
        }
    }
}

impl ChannelConfig {
    /// Check and normalise a configuration before it reaches a filter.
    ///
    /// - attenuation below 2 is rejected
    /// - minimum RSSI outside `[-128, 0]` becomes -128 (check disabled)
    /// - negative threshold becomes 0
    pub fn validated(mut self) -> Result<Self, RadarError> {
        if self.second_order_attenuation < 2 {
            return Err(RadarError::InvalidAttenuation {
                value: self.second_order_attenuation,
            });
        }

        if !(ABSOLUTE_RSSI_LIMIT..=0).contains(&self.minimum_rssi) {
            tracing::warn!(
                minimum_rssi = self.minimum_rssi,
                "minimum RSSI out of range, disabling the check"
            );
            self.minimum_rssi = ABSOLUTE_RSSI_LIMIT;
        }

        if self.variance_threshold < 0 {
            self.variance_threshold = 0;
        }

        Ok(self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Channel Filter / مرشح القناة
// ═══════════════════════════════════════════════════════════════════════════════

/// Sample history and variance detector for one transmitter.
///
/// `S` is the sample ring capacity and `V` the variance ring capacity; both
/// size fixed storage and are chosen at build time (`V <= S`).
#[derive(Debug, Clone)]
pub struct ChannelFilter<
    const S: usize = SAMPLE_BUFFER_SIZE,
    const V: usize = VARIANCE_BUFFER_SIZE,
> {
    config: ChannelConfig,

    samples: [i32; S],
    sample_index: usize,
    samples_valid: bool,

    /// K: samples in the moving average
    average_window: usize,
    moving_average: i32,

    variance_history: [i64; V],
    variance_index: usize,
    variance_valid: bool,

    /// M: variance samples in the integral
    integrator_window: usize,
    variance_sample: i64,
    variance_integral: i64,
    variance_ar: i64,

    /// `None` while booting
    current_variance: Option<i64>,

    /// Last accepted (non-substituted) sample
    current_rssi: Option<i32>,
    last_raw_sample: i32,

    reset_pending: bool,
}

impl ChannelFilter {
    /// Filter with the default capacities and configuration
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const S: usize, const V: usize> Default for ChannelFilter<S, V> {
    fn default() -> Self {
        Self::blank(ChannelConfig::default())
    }
}

impl<const S: usize, const V: usize> ChannelFilter<S, V> {
    const CAPACITY_CHECK: () = assert!(
        S > 0 && V > 0 && V <= S,
        "channel buffers need 0 < V <= S"
    );

    fn blank(config: ChannelConfig) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;

        Self {
            config,
            samples: [0; S],
            sample_index: 0,
            samples_valid: false,
            average_window: MOVING_AVERAGE_WINDOW.min(S),
            moving_average: 0,
            variance_history: [0; V],
            variance_index: 0,
            variance_valid: false,
            integrator_window: VARIANCE_INTEGRATOR_LIMIT.min(V),
            variance_sample: 0,
            variance_integral: 0,
            variance_ar: 0,
            current_variance: None,
            current_rssi: None,
            last_raw_sample: ABSOLUTE_RSSI_LIMIT,
            reset_pending: false,
        }
    }

    /// Create a filter with a validated configuration
    pub fn with_config(config: ChannelConfig) -> Result<Self, RadarError> {
        Ok(Self::blank(config.validated()?))
    }

    /// Set K and M, clamped to `[1, S]` and `[1, V]`
    #[cfg(test)]
    fn with_windows(mut self, average_window: usize, integrator_window: usize) -> Self {
        self.average_window = average_window.clamp(1, S);
        self.integrator_window = integrator_window.clamp(1, V);
        self
    }

    /// Replace the configuration; takes effect on the next sample
    pub fn configure(&mut self, config: ChannelConfig) -> Result<(), RadarError> {
        self.config = config.validated()?;
        Ok(())
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Ask for a full reinitialisation before the next sample
    /// طلب إعادة التهيئة الكاملة قبل العينة التالية
    pub fn request_reset(&mut self) {
        self.reset_pending = true;
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Back to the freshly built state, keeping the configuration
    pub(crate) fn restart(&mut self) {
        *self = Self::blank(self.config);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 🔬 Processing / المعالجة
    // ═══════════════════════════════════════════════════════════════════════

    /// Feed one RSSI reading (dBm) and get the detection status.
    ///
    /// Deterministic in (configuration, previous state, sample).
    pub fn ingest(&mut self, sample: i32) -> RadarStatus {
        if self.reset_pending {
            self.reset_now();
        }

        self.last_raw_sample = sample;
        let value = self.substitute(sample);

        // sample ring
        let written = self.sample_index;
        self.samples[written] = value;
        self.sample_index = (written + 1) % S;
        if self.sample_index == 0 {
            self.samples_valid = true;
        }

        if self.samples_valid {
            self.moving_average = self.average_ending_at(written);

            let deviation = i64::from(value) - i64::from(self.moving_average);
            let mut variance_sample = deviation.saturating_mul(deviation);

            if self.config.second_order_enabled {
                let floor = self.variance_floor();
                variance_sample = variance_sample.saturating_sub(floor).saturating_abs();
            }
            self.variance_sample = variance_sample;

            // variance ring
            let written_var = self.variance_index;
            self.variance_history[written_var] = variance_sample;
            self.variance_index = (written_var + 1) % V;
            if self.variance_index == 0 {
                self.variance_valid = true;
            }

            self.variance_integral = self.integral_ending_at(written_var);
            // both terms are non-negative, the halved sum fits in i64
            self.variance_ar =
                ((i128::from(self.variance_integral) + i128::from(self.variance_ar)) / 2) as i64;

            self.current_variance = Some(if self.config.autoregressive_enabled {
                self.variance_ar
            } else {
                self.variance_integral
            });
        }

        self.decide()
    }

    /// Replace readings weaker than the minimum RSSI
    fn substitute(&mut self, sample: i32) -> i32 {
        if sample >= self.config.minimum_rssi {
            self.current_rssi = Some(sample);
            return sample;
        }

        if self.samples_valid {
            return self.moving_average;
        }

        // no history yet: the first weak reading bootstraps the fallback
        *self.current_rssi.get_or_insert(sample)
    }

    /// Mean of the K samples ending at `last`, walking backwards
    fn average_ending_at(&self, last: usize) -> i32 {
        let sum: i64 = (0..self.average_window)
            .map(|offset| i64::from(self.samples[(last + S - offset) % S]))
            .sum();
        // mean of i32 values always fits in i32
        (sum / self.average_window as i64) as i32
    }

    /// Sum of the M variance samples ending at `last`
    fn integral_ending_at(&self, last: usize) -> i64 {
        let sum: i128 = (0..self.integrator_window)
            .map(|offset| i128::from(self.variance_history[(last + V - offset) % V]))
            .sum();
        sum.min(i128::from(i64::MAX)) as i64
    }

    /// Attenuated mean of the whole variance ring
    fn variance_floor(&self) -> i64 {
        let sum: i128 = self.variance_history.iter().map(|&v| i128::from(v)).sum();
        let mean = sum / V as i128;
        (mean / i128::from(self.config.second_order_attenuation)) as i64
    }

    fn decide(&self) -> RadarStatus {
        match self.current_variance {
            None => RadarStatus::Booting,
            Some(variance) if !self.config.alarm_enabled => RadarStatus::Level(variance),
            Some(variance) if variance >= self.config.variance_threshold => {
                RadarStatus::Detection(variance)
            }
            Some(_) => RadarStatus::NoDetection,
        }
    }

    fn reset_now(&mut self) {
        self.samples = [0; S];
        self.sample_index = 0;
        self.samples_valid = false;
        self.moving_average = 0;
        self.variance_history = [0; V];
        self.variance_index = 0;
        self.variance_valid = false;
        self.variance_sample = 0;
        self.variance_integral = 0;
        self.variance_ar = 0;
        self.current_variance = None;
        self.current_rssi = None;
        self.reset_pending = false;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 🔎 Inspection / الفحص
    // ═══════════════════════════════════════════════════════════════════════

    pub fn is_booting(&self) -> bool {
        self.current_variance.is_none()
    }

    pub fn moving_average(&self) -> i32 {
        self.moving_average
    }

    pub fn variance_sample(&self) -> i64 {
        self.variance_sample
    }

    pub fn variance_integral(&self) -> i64 {
        self.variance_integral
    }

    pub fn variance_ar(&self) -> i64 {
        self.variance_ar
    }

    pub fn current_variance(&self) -> Option<i64> {
        self.current_variance
    }

    pub fn current_rssi(&self) -> Option<i32> {
        self.current_rssi
    }

    pub fn last_raw_sample(&self) -> i32 {
        self.last_raw_sample
    }

    pub fn sample_index(&self) -> usize {
        self.sample_index
    }

    pub fn variance_index(&self) -> usize {
        self.variance_index
    }

    pub fn samples_valid(&self) -> bool {
        self.samples_valid
    }

    pub fn variance_valid(&self) -> bool {
        self.variance_valid
    }

    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn variance_history(&self) -> &[i64] {
        &self.variance_history
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    type Small = ChannelFilter<4, 4>;

    fn feed<const S: usize, const V: usize>(
        filter: &mut ChannelFilter<S, V>,
        samples: &[i32],
    ) -> RadarStatus {
        let mut last = RadarStatus::Booting;
        for &s in samples {
            last = filter.ingest(s);
        }
        last
    }

    #[test]
    fn test_booting_until_buffer_wraps() {
        let mut filter = Small::default();
        assert_eq!(feed(&mut filter, &[-50, -50, -50]), RadarStatus::Booting);
        assert!(filter.is_booting());
        assert!(!filter.samples_valid());
    }

    #[test]
    fn test_constant_samples_give_zero_variance() {
        let mut filter = Small::default();
        let status = feed(&mut filter, &[-50, -50, -50, -50]);

        assert!(filter.samples_valid());
        assert_eq!(filter.moving_average(), -50);
        assert_eq!(filter.variance_sample(), 0);
        assert_eq!(filter.current_variance(), Some(0));
        assert_eq!(status, RadarStatus::NoDetection);
    }

    #[test]
    fn test_outlier_after_constant_is_detected() {
        let mut filter = Small::default();
        feed(&mut filter, &[-50, -50, -50, -50]);

        let status = filter.ingest(-30);

        // ring is [-30, -50, -50, -50] → average -45, deviation 15
        assert_eq!(filter.moving_average(), -45);
        assert_eq!(filter.variance_sample(), 225);
        assert_eq!(status, RadarStatus::Detection(225));
    }

    #[test]
    fn test_convergence_on_default_capacity() {
        let mut filter = ChannelFilter::new();
        let status = feed(&mut filter, &[-62; 40]);
        assert_eq!(filter.current_variance(), Some(0));
        assert_eq!(status, RadarStatus::NoDetection);
    }

    #[test]
    fn test_outlier_on_default_capacity() {
        let mut filter = ChannelFilter::new();
        feed(&mut filter, &[-50; 40]);
        let status = filter.ingest(-30);
        assert!(status.is_detection(), "got {status:?}");
    }

    #[test]
    fn test_weak_sample_before_valid_uses_current_rssi() {
        let mut filter = Small::default();
        filter.ingest(-60);
        filter.ingest(-95);

        assert_eq!(filter.last_raw_sample(), -95);
        assert_eq!(filter.samples()[1], -60);
        assert_eq!(filter.current_rssi(), Some(-60));
    }

    #[test]
    fn test_first_weak_sample_bootstraps() {
        let mut filter = Small::default();
        filter.ingest(-95);
        assert_eq!(filter.samples()[0], -95);
        assert_eq!(filter.current_rssi(), Some(-95));

        filter.ingest(-99);
        assert_eq!(filter.samples()[1], -95);
    }

    #[test]
    fn test_weak_sample_after_valid_uses_moving_average() {
        let mut filter = Small::default();
        feed(&mut filter, &[-50, -50, -50, -50]);

        filter.ingest(-100);

        assert_eq!(filter.samples()[0], -50);
        assert_eq!(filter.last_raw_sample(), -100);
        assert_eq!(filter.current_variance(), Some(0));
    }

    #[test]
    fn test_reset_reinitialises_before_sample() {
        let mut filter = Small::default();
        feed(&mut filter, &[-50, -50, -50, -50, -40]);

        filter.request_reset();
        let status = filter.ingest(-70);

        assert_eq!(status, RadarStatus::Booting);
        assert!(!filter.is_reset_pending());
        assert!(!filter.samples_valid());
        assert!(!filter.variance_valid());
        assert_eq!(filter.sample_index(), 1);
        assert_eq!(filter.variance_index(), 0);
        assert_eq!(filter.samples()[0], -70);
        assert_eq!(filter.current_rssi(), Some(-70));
        assert_eq!(filter.variance_ar(), 0);

        // proceeds normally afterwards
        let status = feed(&mut filter, &[-70, -70, -70]);
        assert_eq!(status, RadarStatus::NoDetection);
    }

    #[test]
    fn test_alarm_disabled_returns_raw_level() {
        let config = ChannelConfig {
            alarm_enabled: false,
            ..ChannelConfig::default()
        };
        let mut filter = Small::with_config(config).unwrap();
        assert_eq!(feed(&mut filter, &[-50, -50, -50]), RadarStatus::Booting);
        assert_eq!(filter.ingest(-50), RadarStatus::Level(0));
        assert_eq!(filter.ingest(-30), RadarStatus::Level(225));
    }

    #[test]
    fn test_below_threshold_is_no_detection() {
        let mut filter = Small::default();
        feed(&mut filter, &[-50, -50, -50, -50]);
        // sum -197 / 4 truncates to -49, deviation 2 → 4 < 16
        assert_eq!(filter.ingest(-47), RadarStatus::NoDetection);
        assert_eq!(filter.current_variance(), Some(4));
    }

    #[test]
    fn test_autoregressive_smoothing() {
        let config = ChannelConfig {
            autoregressive_enabled: true,
            ..ChannelConfig::default()
        };
        let mut filter = Small::with_config(config).unwrap();
        feed(&mut filter, &[-50, -50, -50, -50]);

        filter.ingest(-30);
        assert_eq!(filter.variance_integral(), 225);
        assert_eq!(filter.variance_ar(), 112);
        assert_eq!(filter.current_variance(), Some(112));
    }

    #[test]
    fn test_second_order_floor_is_subtracted() {
        let mut filter = Small::default();
        feed(&mut filter, &[-50, -50, -50, -50, -30]);
        // history holds 225; floor = (225 / 4) / 16 = 3
        filter.ingest(-30);
        // ring [-30, -30, -50, -50] → average -40, deviation 10 → 100 - 3
        assert_eq!(filter.moving_average(), -40);
        assert_eq!(filter.variance_sample(), 97);
    }

    #[test]
    fn test_second_order_disabled_keeps_raw_sample() {
        let config = ChannelConfig {
            second_order_enabled: false,
            ..ChannelConfig::default()
        };
        let mut filter = Small::with_config(config).unwrap();
        feed(&mut filter, &[-50, -50, -50, -50, -30, -30]);
        assert_eq!(filter.variance_sample(), 100);
    }

    #[test]
    fn test_average_wraps_through_index_zero() {
        let mut filter = ChannelFilter::<4, 4>::default().with_windows(2, 2);
        feed(&mut filter, &[-10, -20, -30, -40]);
        // last write at index 3, window covers 3 and 2
        assert_eq!(filter.moving_average(), -35);

        filter.ingest(-60);
        // last write at index 0, window covers 0 and 3
        assert_eq!(filter.moving_average(), -50);
    }

    #[test]
    fn test_average_window_follows_build_constant() {
        assert_eq!(ChannelFilter::new().average_window, MOVING_AVERAGE_WINDOW);
        assert_eq!(Small::default().average_window, 4);
        assert_eq!(
            ChannelFilter::new().integrator_window,
            VARIANCE_INTEGRATOR_LIMIT
        );
    }

    #[test]
    fn test_integral_window_covers_most_recent_entries() {
        let config = ChannelConfig {
            second_order_enabled: false,
            ..ChannelConfig::default()
        };
        let mut filter = ChannelFilter::<4, 4>::with_config(config)
            .unwrap()
            .with_windows(1, 2);
        feed(&mut filter, &[-50, -50, -50, -50]);
        // K = 1 → average equals the sample, every variance sample is 0
        assert_eq!(filter.ingest(-30), RadarStatus::NoDetection);
        assert_eq!(filter.variance_integral(), 0);
    }

    #[test]
    fn test_attenuation_below_two_rejected() {
        let config = ChannelConfig {
            second_order_attenuation: 1,
            ..ChannelConfig::default()
        };
        assert!(ChannelFilter::<4, 4>::with_config(config).is_err());

        let mut filter = ChannelFilter::new();
        assert!(filter.configure(config).is_err());
        assert_eq!(filter.config().second_order_attenuation, 16);
    }

    #[test]
    fn test_config_normalisation() {
        let config = ChannelConfig {
            minimum_rssi: 10,
            variance_threshold: -5,
            ..ChannelConfig::default()
        }
        .validated()
        .unwrap();
        assert_eq!(config.minimum_rssi, ABSOLUTE_RSSI_LIMIT);
        assert_eq!(config.variance_threshold, 0);
    }

    #[test]
    fn test_extreme_samples_do_not_overflow() {
        let mut filter = Small::default();
        let extremes = [i32::MAX, i32::MIN, i32::MAX, i32::MIN, i32::MAX, i32::MIN];
        let status = feed(&mut filter, &extremes);
        assert!(status.value().is_some());
    }

    macro_rules! bounds_property {
        ($name:ident, $s:expr, $v:expr) => {
            proptest! {
                #[test]
                fn $name(
                    samples in prop::collection::vec(any::<i32>(), 0..200),
                    reset_at in 0usize..200,
                ) {
                    let mut filter = ChannelFilter::<$s, $v>::default();
                    for (i, s) in samples.iter().enumerate() {
                        if i == reset_at {
                            filter.request_reset();
                        }
                        filter.ingest(*s);
                        prop_assert!(filter.sample_index() < $s);
                        prop_assert!(filter.variance_index() < $v);
                        if let Some(v) = filter.current_variance() {
                            prop_assert!(v >= 0);
                        }
                    }
                }
            }
        };
    }

    bounds_property!(prop_bounds_1_1, 1, 1);
    bounds_property!(prop_bounds_2_1, 2, 1);
    bounds_property!(prop_bounds_3_3, 3, 3);
    bounds_property!(prop_bounds_5_2, 5, 2);
    bounds_property!(prop_bounds_8_8, 8, 8);
    bounds_property!(prop_bounds_default, 32, 16);

    proptest! {
        #[test]
        fn prop_constant_input_converges(rssi in -80i32..0, extra in 0usize..40) {
            let mut filter = ChannelFilter::new();
            for _ in 0..(SAMPLE_BUFFER_SIZE + extra) {
                filter.ingest(rssi);
            }
            prop_assert_eq!(filter.current_variance(), Some(0));
        }
    }
}
