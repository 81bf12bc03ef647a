use crate::models::error::AudioError;
use crate::models::state::PumpState;

/// Observer of a single-to-many stream adapter.
///
/// Called from whichever thread caused the event; pump errors arrive on the
/// pump thread. Implementations must not call back into the adapter's
/// client lifetime methods.
pub trait FanOutDelegate: Send + Sync {
    fn on_pump_state_changed(&self, _state: PumpState) {}

    fn on_client_count_changed(&self, _count: usize) {}

    fn on_error(&self, error: &AudioError);
}
