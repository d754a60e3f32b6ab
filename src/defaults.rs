//! Protocol and timing constants shared by both binaries.

/// Logical address of the CCU (LAUVM), per §6.
pub const LOGICAL_ADDRESS_CCU: u8 = 0x01;

/// Logical address of the first RSM instance; instances 1..3 follow at +1 each.
pub const LOGICAL_ADDRESS_RSM_BASE: u8 = 0x08;

/// Maximum number of concurrently configured RSM instances / CCU targets.
pub const MAX_INSTANCES: usize = 4;

/// Maximum body length in bytes, per §3.
pub const MAX_BODY_LEN: usize = 65522;

/// The message number wraps modulo this value (11-bit counter), per §4.1.
pub const MESSAGE_NUMBER_WRAP: u16 = 2048;

/// BCB tick period, per §4.8.
pub const BCB_PERIOD_MS: u64 = 50;

/// Line-state counter update period, per §4.8.
pub const LINK_PERIOD_MS: u64 = 2000;

/// Number of BCB ticks between line-state counter updates.
pub const LINK_PERIOD_TICKS: u64 = LINK_PERIOD_MS / BCB_PERIOD_MS;

/// Probability denominator for a link-up change event (1/2).
pub const LINK_CHANGE_PROBABILITY: u32 = 2;

/// Probability denominator for the nested link-low-time event (1/10).
pub const LINK_LOW_PROBABILITY: u32 = 10;

/// Probability denominator for a signal-detect change event (1/3).
pub const SIGN_DET_CHANGE_PROBABILITY: u32 = 3;

/// Increment applied to `link_up_low_time_us100` when the nested event fires:
/// `LINK_PERIOD_MS * 10`, in units of 1/100 microsecond.
pub const LINK_LOW_TIME_INCREMENT_US100: u32 = (LINK_PERIOD_MS as u32) * 10;

/// CCU keep-alive watchdog timeout, per §5.
pub const KEEPALIVE_TIMEOUT_SECS: u64 = 60;

/// Default bounded queue capacity for a single RSM instance's incoming queue.
pub const INSTANCE_QUEUE_CAPACITY: usize = 100;

/// Default bounded queue capacity for the CCU's outgoing request queue.
pub const CCU_REQUEST_QUEUE_CAPACITY: usize = 50;

/// Default bounded queue capacity (per configured target) for the CCU's
/// incoming response queue.
pub const CCU_RESPONSE_QUEUE_CAPACITY_PER_TARGET: usize = 50;

/// Default port for the CCU's status-publication stream, used when the
/// `[status_publisher]` config section is absent.
pub const DEFAULT_STATUS_PUBLISHER_PORT: u16 = 9100;

/// RSK value reported when self-test completes without injected failure.
pub const RSK_OK: u8 = 0x3F;

/// RSK value reported when `simulate_control_failure` is set for the instance.
pub const RSK_FAILURE: u8 = 0x3E;

/// Control type used by the CCU's self-test step (ProvestiControl.tk).
pub const SELFTEST_TK: u8 = 0x01;

/// Control-results request kind used by the CCU's self-test step (VydatControlResults.vrk).
pub const SELFTEST_VRK: u8 = 0x0F;

/// Response-wait timeout used by the CCU sequencer for request/response steps.
pub const RESPONSE_TIMEOUT_MS: u64 = 5000;

/// Simulated self-test duration on the RSM side. VSK reports the real
/// elapsed time of this sleep rather than a hardcoded constant, per §4.6.
pub const SELFTEST_SLEEP_MS: u64 = 150;
